//! Result rendering and progress display.

use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sqlfan_core::{Query, ResultSet};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Serialize)]
struct QueryResult<'a> {
    query: &'a str,
    rows: &'a ResultSet,
}

/// Print one result set per query, in input order.
pub fn render_results(queries: &[Query], results: &[ResultSet], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let payload: Vec<QueryResult> = queries
                .iter()
                .zip(results)
                .map(|(query, rows)| QueryResult {
                    query: query.sql(),
                    rows,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Table => {
            for (idx, (query, rows)) in queries.iter().zip(results).enumerate() {
                println!("-- [{}] {} ({} rows)", idx, query.sql(), rows.len());
                for row in rows {
                    let cells: Vec<String> = row.0.iter().map(|v| v.to_string()).collect();
                    println!("{}", cells.join(" | "));
                }
                println!();
            }
        }
    }
    Ok(())
}

/// Print one page of a streamed query.
pub fn render_page(page_no: usize, rows: &ResultSet, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(rows)?),
        OutputFormat::Table => {
            println!("-- page {} ({} rows)", page_no, rows.len());
            for row in rows {
                let cells: Vec<String> = row.0.iter().map(|v| v.to_string()).collect();
                println!("{}", cells.join(" | "));
            }
        }
    }
    Ok(())
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("static template is valid"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn maybe_spinner(show_progress: bool) -> Option<ProgressBar> {
    if !show_progress {
        return None;
    }
    let pb = new_spinner();
    if pb.is_hidden() {
        None
    } else {
        Some(pb)
    }
}
