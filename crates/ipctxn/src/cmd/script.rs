use std::collections::HashMap;
use std::io::{self, Read};

use ipctxn_parcel::{Parcel, DEFAULT_MAX_PARCEL_SIZE};
use ipctxn_transaction::{PendingTransactionSet, Transaction};
use serde::{Deserialize, Serialize};

use crate::cmd::ScriptArgs;
use crate::exit::{io_error, json_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{payload_preview, print_records, OutputFormat, Record};

/// One step of a transaction script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    /// Add a zeroed parcel of `capacity` bytes and name its handle `label`.
    BeginPut { label: String, capacity: usize },
    /// Add a parcel holding `data` and name its handle `label`.
    BeginGet { label: String, data: String },
    /// Copy `data` into the parcel of a pending transaction.
    Write {
        label: String,
        #[serde(default)]
        offset: usize,
        data: String,
    },
    FinalizePut { label: String, committed: usize },
    FinalizeGet { label: String },
    IsEmpty,
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Self::BeginPut { .. } => "begin_put",
            Self::BeginGet { .. } => "begin_get",
            Self::Write { .. } => "write",
            Self::FinalizePut { .. } => "finalize_put",
            Self::FinalizeGet { .. } => "finalize_get",
            Self::IsEmpty => "is_empty",
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Self::BeginPut { label, .. }
            | Self::BeginGet { label, .. }
            | Self::Write { label, .. }
            | Self::FinalizePut { label, .. }
            | Self::FinalizeGet { label } => Some(label),
            Self::IsEmpty => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepResult {
    step: usize,
    op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    pending: usize,
}

impl Record for StepResult {
    fn headers() -> &'static [&'static str] {
        &[
            "STEP",
            "OP",
            "LABEL",
            "TRANSACTION",
            "OUTCOME",
            "PAYLOAD",
            "PENDING",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.step.to_string(),
            self.op.to_string(),
            self.label.clone().unwrap_or_default(),
            self.transaction.clone().unwrap_or_default(),
            self.outcome.to_string(),
            self.payload.clone().unwrap_or_default(),
            self.pending.to_string(),
        ]
    }
}

struct Outcome {
    outcome: &'static str,
    transaction: Option<Transaction>,
    payload: Option<String>,
}

impl Outcome {
    fn of(outcome: &'static str) -> Self {
        Self {
            outcome,
            transaction: None,
            payload: None,
        }
    }

    fn begun(transaction: Transaction) -> Self {
        Self {
            outcome: "ok",
            transaction: Some(transaction),
            payload: None,
        }
    }

    fn finalized(parcel: &Parcel) -> Self {
        Self {
            outcome: "ok",
            transaction: None,
            payload: Some(payload_preview(parcel.data())),
        }
    }
}

pub fn run(args: ScriptArgs, format: OutputFormat) -> CliResult<i32> {
    let source = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|err| io_error("failed to read script from stdin", err))?;
        buf
    } else {
        std::fs::read_to_string(&args.file).map_err(|err| {
            io_error(&format!("failed to read {}", args.file.display()), err)
        })?
    };

    let steps = parse_steps(&source)?;
    tracing::debug!(steps = steps.len(), "running transaction script");

    let results = run_steps(&steps)?;
    print_records(&results, format);
    Ok(SUCCESS)
}

fn parse_steps(source: &str) -> CliResult<Vec<Step>> {
    serde_json::from_str(source).map_err(|err| json_error("invalid script", err))
}

fn run_steps(steps: &[Step]) -> CliResult<Vec<StepResult>> {
    let mut set = PendingTransactionSet::new();
    let mut labels: HashMap<String, Transaction> = HashMap::new();
    let mut results = Vec::with_capacity(steps.len());

    for (index, step) in steps.iter().enumerate() {
        let outcome = apply(&mut set, &mut labels, step).map_err(|err| CliError {
            message: format!("step {index}: {}", err.message),
            ..err
        })?;

        tracing::trace!(step = index, op = step.op(), outcome = outcome.outcome, "step applied");
        results.push(StepResult {
            step: index,
            op: step.op(),
            label: step.label().map(str::to_owned),
            transaction: outcome.transaction.map(|txn| txn.to_string()),
            outcome: outcome.outcome,
            payload: outcome.payload,
            pending: set.len(),
        });
    }

    Ok(results)
}

fn apply(
    set: &mut PendingTransactionSet,
    labels: &mut HashMap<String, Transaction>,
    step: &Step,
) -> CliResult<Outcome> {
    match step {
        Step::BeginPut { label, capacity } => {
            let parcel = Parcel::with_capacity_checked(*capacity, DEFAULT_MAX_PARCEL_SIZE)
                .map_err(|err| CliError::new(DATA_INVALID, err.to_string()))?;
            let transaction = set.add(parcel);
            labels.insert(label.clone(), transaction);
            Ok(Outcome::begun(transaction))
        }
        Step::BeginGet { label, data } => {
            let transaction = set.add(Parcel::from_bytes(data.as_bytes()));
            labels.insert(label.clone(), transaction);
            Ok(Outcome::begun(transaction))
        }
        Step::Write {
            label,
            offset,
            data,
        } => {
            let transaction = lookup(labels, label)?;
            let Some(parcel) = set.parcel_mut(transaction) else {
                return Ok(Outcome::of("none"));
            };
            let bytes = data.as_bytes();
            match offset.checked_add(bytes.len()) {
                Some(end) if end <= parcel.len() => {
                    parcel.data_mut()[*offset..end].copy_from_slice(bytes);
                    Ok(Outcome::of("ok"))
                }
                _ => Ok(Outcome::of("out_of_bounds")),
            }
        }
        Step::FinalizePut { label, committed } => {
            let transaction = lookup(labels, label)?;
            match set.finalize_for_put(transaction, *committed) {
                Some(mut parcel) => {
                    parcel
                        .commit(*committed)
                        .map_err(|err| CliError::new(INTERNAL, err.to_string()))?;
                    Ok(Outcome::finalized(&parcel))
                }
                None => Ok(Outcome::of("none")),
            }
        }
        Step::FinalizeGet { label } => {
            let transaction = lookup(labels, label)?;
            match set.finalize_for_get(transaction) {
                Some(parcel) => Ok(Outcome::finalized(&parcel)),
                None => Ok(Outcome::of("none")),
            }
        }
        Step::IsEmpty => Ok(Outcome::of(if set.is_empty() { "true" } else { "false" })),
    }
}

fn lookup(labels: &HashMap<String, Transaction>, label: &str) -> CliResult<Transaction> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| CliError::new(DATA_INVALID, format!("unknown label '{label}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(results: &[StepResult]) -> Vec<&'static str> {
        results.iter().map(|result| result.outcome).collect()
    }

    #[test]
    fn put_then_get_round_trip() {
        let steps = parse_steps(
            r#"[
                {"op": "begin_put", "label": "p", "capacity": 8},
                {"op": "write", "label": "p", "data": "abcd"},
                {"op": "is_empty"},
                {"op": "finalize_put", "label": "p", "committed": 4},
                {"op": "is_empty"},
                {"op": "begin_get", "label": "g", "data": "hello"},
                {"op": "finalize_get", "label": "g"}
            ]"#,
        )
        .unwrap();

        let results = run_steps(&steps).unwrap();
        assert_eq!(
            outcomes(&results),
            ["ok", "ok", "false", "ok", "true", "ok", "ok"]
        );
        assert_eq!(results[3].payload.as_deref(), Some("abcd"));
        assert_eq!(results[6].payload.as_deref(), Some("hello"));
        assert_eq!(results[6].pending, 0);
        assert!(results[0].transaction.is_some());
    }

    #[test]
    fn repeated_finalize_reports_none() {
        let steps = parse_steps(
            r#"[
                {"op": "begin_get", "label": "g", "data": "x"},
                {"op": "finalize_get", "label": "g"},
                {"op": "finalize_get", "label": "g"},
                {"op": "finalize_put", "label": "g", "committed": 0}
            ]"#,
        )
        .unwrap();

        let results = run_steps(&steps).unwrap();
        assert_eq!(outcomes(&results), ["ok", "ok", "none", "none"]);
    }

    #[test]
    fn oversized_commit_keeps_transaction_pending() {
        let steps = parse_steps(
            r#"[
                {"op": "begin_put", "label": "p", "capacity": 2},
                {"op": "write", "label": "p", "offset": 1, "data": "ab"},
                {"op": "finalize_put", "label": "p", "committed": 3},
                {"op": "is_empty"},
                {"op": "finalize_put", "label": "p", "committed": 2}
            ]"#,
        )
        .unwrap();

        let results = run_steps(&steps).unwrap();
        assert_eq!(
            outcomes(&results),
            ["ok", "out_of_bounds", "none", "false", "ok"]
        );
        assert_eq!(results[2].pending, 1);
    }

    #[test]
    fn unknown_label_is_data_invalid() {
        let steps = parse_steps(r#"[{"op": "finalize_get", "label": "missing"}]"#).unwrap();
        let err = run_steps(&steps).err().unwrap();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn oversized_capacity_is_data_invalid() {
        let steps = parse_steps(&format!(
            r#"[{{"op": "begin_put", "label": "p", "capacity": {}}}]"#,
            usize::MAX
        ))
        .unwrap();
        let err = run_steps(&steps).err().unwrap();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("step 0: "));

        let steps = parse_steps(&format!(
            r#"[{{"op": "begin_put", "label": "p", "capacity": {}}}, {{"op": "is_empty"}}]"#,
            DEFAULT_MAX_PARCEL_SIZE
        ))
        .unwrap();
        assert_eq!(outcomes(&run_steps(&steps).unwrap()), ["ok", "false"]);
    }

    #[test]
    fn malformed_script_is_rejected() {
        let err = parse_steps(r#"[{"op": "abort"}]"#).err().unwrap();
        assert_eq!(err.code, DATA_INVALID);
    }
}
