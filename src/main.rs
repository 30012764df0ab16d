// Entry point and high-level run flow.
//
// One run is a straight pipeline:
// - load and filter the work-order sheet,
// - build the period summary, the late-component tally and the
//   last-month comparison,
// - write the JSON documents and the "Results" workbook,
// - print a short status report and a preview of the comparison.
mod error;
mod excel;
mod filter;
mod loader;
mod output;
mod reports;
mod rolling;
mod stats;
mod types;
mod util;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rolling::DEFAULT_ROLLING_MONTHS;

#[derive(Parser, Debug)]
#[command(name = "wo_report")]
#[command(version, about = "Work-order volume and lateness report", long_about = None)]
struct Cli {
    /// Work-order workbook (xlsx, xls, xlsb, ods) or a CSV export of it
    #[arg(value_name = "INPUT", default_value = "~CRF096_December2024.xlsx")]
    input: PathBuf,

    /// Directory for the JSON documents and the workbook
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// File stem of the workbook; the reference date is appended
    #[arg(long, default_value = "Workorder Analysis")]
    report_name: String,

    /// Length of the rolling comparison window in months
    #[arg(long, default_value_t = DEFAULT_ROLLING_MONTHS, value_parser = clap::value_parser!(u32).range(1..))]
    rolling_months: u32,

    /// Reference date for the comparison and file name (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_reference_date)]
    today: Option<NaiveDate>,

    /// Skip the last-month vs rolling comparison
    #[arg(long)]
    skip_rolling: bool,

    /// Rows of the comparison shown on the console
    #[arg(long, default_value_t = 6)]
    preview_rows: usize,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_reference_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let (data, load_report) = match loader::load(&cli.input) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "could not load work orders");
            eprintln!("Failed to load file: {}\n", e);
            return Err(e).context("no work-order data to report on");
        }
    };
    println!(
        "Successfully loaded input worksheet ({} rows scanned, {} posted work orders)",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.included_rows)
    );
    if load_report.unreadable_rows > 0 {
        println!(
            "Note: {} rows skipped because they could not be read.",
            util::format_int(load_report.unreadable_rows)
        );
    }
    if !load_report.skipped_segments.is_empty() {
        println!(
            "Note: {} component entries skipped due to unexpected format.",
            util::format_int(load_report.skipped_segments.len())
        );
    }

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let summary = reports::summarize(&data);
    let components = reports::summarize_late_components(&data);
    let comparison = (!cli.skip_rolling)
        .then(|| rolling::compare_last_month(&data, today, cli.rolling_months));
    info!(
        years = summary.len(),
        reference = %today,
        "summaries computed"
    );

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let dir = &cli.output_dir;
    output::write_json(&dir.join("data.json"), &data)?;
    output::write_json(&dir.join("results.json"), &summary)?;
    output::write_json(&dir.join("components.json"), &components)?;
    if let Some(cmp) = &comparison {
        output::write_json(&dir.join("last_month.json"), cmp)?;
    }

    let workbook_path = dir.join(format!(
        "{}_{}.xlsx",
        cli.report_name,
        today.format("%d%b%Y")
    ));
    excel::save_results(&workbook_path, &summary, &components, comparison.as_ref())
        .with_context(|| format!("writing {}", workbook_path.display()))?;
    println!("Outputs saved to {}\n", workbook_path.display());

    if let Some(cmp) = &comparison {
        println!(
            "{} vs {} ({} to {})\n",
            cmp.last_month_label, cmp.rolling_label, cmp.window_start, cmp.window_end
        );
        output::preview_table_rows(&rolling::preview_rows(cmp), cli.preview_rows);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
