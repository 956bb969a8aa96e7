use std::hint::black_box;
use std::time::{Duration, Instant};

use ipctxn_parcel::Parcel;
use ipctxn_portal::{open_pair, PortalConfig};
use ipctxn_transaction::{PendingTransactionSet, SetStats};
use serde::Serialize;

use crate::cmd::{BenchArgs, BenchTarget};
use crate::exit::{portal_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_records, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct BenchReport {
    target: &'static str,
    iterations: u64,
    depth: usize,
    capacity: usize,
    transactions: u64,
    elapsed_ms: u128,
    transactions_per_sec: u64,
    slots_allocated: u64,
    slots_reused: u64,
    slots_freed: u64,
}

impl Record for BenchReport {
    fn headers() -> &'static [&'static str] {
        &[
            "TARGET",
            "ITERATIONS",
            "DEPTH",
            "CAPACITY",
            "TRANSACTIONS",
            "ELAPSED MS",
            "TXN PER SEC",
            "SLOTS ALLOCATED",
            "SLOTS REUSED",
            "SLOTS FREED",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.target.to_string(),
            self.iterations.to_string(),
            self.depth.to_string(),
            self.capacity.to_string(),
            self.transactions.to_string(),
            self.elapsed_ms.to_string(),
            self.transactions_per_sec.to_string(),
            self.slots_allocated.to_string(),
            self.slots_reused.to_string(),
            self.slots_freed.to_string(),
        ]
    }
}

pub fn run(args: BenchArgs, format: OutputFormat) -> CliResult<i32> {
    validate(&args, &PortalConfig::default())?;

    let (target, (stats, elapsed)) = match args.target {
        BenchTarget::Set => ("set", bench_set(&args)?),
        BenchTarget::Portal => ("portal", bench_portal(&args)?),
    };

    let transactions = args.iterations.saturating_mul(args.depth as u64);
    let report = BenchReport {
        target,
        iterations: args.iterations,
        depth: args.depth,
        capacity: args.capacity,
        transactions,
        elapsed_ms: elapsed.as_millis(),
        transactions_per_sec: per_second(transactions, elapsed),
        slots_allocated: stats.slots_allocated,
        slots_reused: stats.slots_reused,
        slots_freed: stats.slots_freed,
    };

    tracing::info!(
        target = report.target,
        transactions = report.transactions,
        elapsed_ms = %report.elapsed_ms,
        "benchmark finished"
    );
    print_records(&[report], format);
    Ok(SUCCESS)
}

/// Reject arguments outside the limits a portal pair enforces.
fn validate(args: &BenchArgs, limits: &PortalConfig) -> CliResult<()> {
    if args.iterations == 0 {
        return Err(CliError::new(USAGE, "--iterations must be greater than zero"));
    }
    if args.depth == 0 || args.depth > limits.max_queued_parcels {
        return Err(CliError::new(
            USAGE,
            format!("--depth must be between 1 and {}", limits.max_queued_parcels),
        ));
    }
    if args.capacity > limits.max_parcel_size {
        return Err(CliError::new(
            USAGE,
            format!("--capacity must be at most {} bytes", limits.max_parcel_size),
        ));
    }
    match args.depth.checked_mul(args.capacity) {
        Some(outstanding) if outstanding <= limits.max_queued_bytes => Ok(()),
        _ => Err(CliError::new(
            USAGE,
            format!(
                "--depth times --capacity must be at most {} bytes",
                limits.max_queued_bytes
            ),
        )),
    }
}

fn bench_set(args: &BenchArgs) -> CliResult<(SetStats, Duration)> {
    let mut set = PendingTransactionSet::new();
    let mut pending = Vec::with_capacity(args.depth);
    let mut misses = 0u64;

    let start = Instant::now();
    for _ in 0..args.iterations {
        pending.extend((0..args.depth).map(|_| set.add(Parcel::with_capacity(args.capacity))));
        for transaction in pending.drain(..) {
            match set.finalize_for_put(transaction, args.capacity) {
                Some(parcel) => {
                    black_box(parcel);
                }
                None => misses += 1,
            }
        }
    }
    let elapsed = start.elapsed();

    if misses > 0 {
        return Err(CliError::new(
            INTERNAL,
            format!("{misses} transactions failed to finalize"),
        ));
    }
    Ok((set.stats(), elapsed))
}

fn bench_portal(args: &BenchArgs) -> CliResult<(SetStats, Duration)> {
    let (producer, consumer) = open_pair();
    let mut pending = Vec::with_capacity(args.depth);

    let start = Instant::now();
    for _ in 0..args.iterations {
        for _ in 0..args.depth {
            let transaction = producer
                .begin_put(args.capacity)
                .map_err(|err| portal_error("begin put failed", err))?;
            pending.push(transaction);
        }
        for transaction in pending.drain(..) {
            producer
                .commit_put(transaction, args.capacity)
                .map_err(|err| portal_error("commit put failed", err))?;
        }
        for _ in 0..args.depth {
            let parcel = consumer
                .get()
                .map_err(|err| portal_error("get failed", err))?;
            black_box(parcel);
        }
    }
    let elapsed = start.elapsed();

    let puts = producer.stats().puts;
    let gets = consumer.stats().gets;
    Ok((combine(puts, gets), elapsed))
}

fn combine(a: SetStats, b: SetStats) -> SetStats {
    SetStats {
        slots_allocated: a.slots_allocated + b.slots_allocated,
        slots_reused: a.slots_reused + b.slots_reused,
        slots_freed: a.slots_freed + b.slots_freed,
    }
}

fn per_second(count: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return count;
    }
    (count as f64 / secs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(target: BenchTarget, iterations: u64, depth: usize) -> BenchArgs {
        BenchArgs {
            iterations,
            depth,
            capacity: 8,
            target,
        }
    }

    #[test]
    fn set_bench_with_depth_one_allocates_once() {
        let (stats, _) = bench_set(&args(BenchTarget::Set, 50, 1)).unwrap();
        assert_eq!(stats.slots_allocated, 1);
        assert_eq!(stats.slots_reused, 49);
        assert_eq!(stats.slots_freed, 0);
    }

    #[test]
    fn set_bench_with_depth_allocates_per_extra_transaction() {
        let (stats, _) = bench_set(&args(BenchTarget::Set, 10, 3)).unwrap();
        // Each round reuses the retained slot for its first transaction and
        // frees all but the last slot it finalizes.
        assert_eq!(stats.slots_allocated + stats.slots_reused, 30);
        assert_eq!(stats.slots_reused, 9);
        assert_eq!(stats.slots_freed, 20);
    }

    #[test]
    fn portal_bench_counts_both_sides() {
        let (stats, _) = bench_portal(&args(BenchTarget::Portal, 20, 1)).unwrap();
        assert_eq!(stats.slots_allocated, 2);
        assert_eq!(stats.slots_reused, 38);
    }

    #[test]
    fn rejects_sizes_beyond_portal_limits() {
        let limits = PortalConfig::default();
        let cases = [
            (0, 1, 8),
            (1, 0, 8),
            (1, limits.max_queued_parcels + 1, 8),
            (1, usize::MAX, 8),
            (1, 1, limits.max_parcel_size + 1),
            (1, 1, usize::MAX),
            (1, 8, limits.max_parcel_size),
        ];
        for (iterations, depth, capacity) in cases {
            let args = BenchArgs {
                iterations,
                depth,
                capacity,
                target: BenchTarget::Set,
            };
            let err = validate(&args, &limits).err().unwrap();
            assert_eq!(err.code, USAGE, "{iterations} {depth} {capacity}");
        }
    }

    #[test]
    fn accepts_sizes_at_portal_limits() {
        let limits = PortalConfig::default();
        let full = BenchArgs {
            iterations: 1,
            depth: limits.max_queued_parcels,
            capacity: limits.max_queued_bytes / limits.max_queued_parcels,
            target: BenchTarget::Portal,
        };
        assert!(validate(&full, &limits).is_ok());
        assert!(validate(&args(BenchTarget::Set, 1, 1), &limits).is_ok());
    }

    #[test]
    fn run_rejects_oversized_depth_before_allocating() {
        let args = BenchArgs {
            iterations: 1,
            depth: usize::MAX,
            capacity: 8,
            target: BenchTarget::Set,
        };
        let err = run(args, OutputFormat::Json).err().unwrap();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn per_second_handles_zero_elapsed() {
        assert_eq!(per_second(10, Duration::ZERO), 10);
        assert_eq!(per_second(10, Duration::from_secs(2)), 5);
    }
}
