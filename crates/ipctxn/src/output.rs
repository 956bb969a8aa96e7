use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A record that can be printed in every [`OutputFormat`].
pub trait Record: Serialize {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

/// Print `records`: one JSON object per line, one table, or one
/// `key=value` line per record.
pub fn print_records<R: Record>(records: &[R], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(R::headers().to_vec());
            for record in records {
                table.add_row(record.cells());
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!("{}", pretty_line(R::headers(), &record.cells()));
            }
        }
    }
}

fn pretty_line(headers: &[&str], cells: &[String]) -> String {
    headers
        .iter()
        .zip(cells)
        .map(|(header, cell)| format!("{}={cell}", header.to_lowercase().replace(' ', "_")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a byte payload as text when it is UTF-8.
pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.trim_end_matches('\0').to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
