//! CLI Tool Example
//!
//! This example demonstrates how to build a command-line tool
//! using wiscreport for turning score exports into report documents.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (for example `RUST_LOG=wiscreport=debug`).

use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;
use wiscreport::{
    summary_to_string, Delivery, OutputFormat, ReportBuilder, ReportError, SourceFile,
    UploadStatus,
};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <output-dir> <input.csv>... [options]", args[0]);
        eprintln!("\nOptions:");
        eprintln!("  --pdf                 Render PDF instead of DOCX");
        eprintln!("  --json                Print extracted records as JSON instead of rendering");
        eprintln!("  --examiner-title <t>  Title printed under the examiner's name");
        eprintln!("\nExamples:");
        eprintln!("  {} out scores.csv", args[0]);
        eprintln!("  {} out class_a.csv class_b.xlsx --pdf", args[0]);
        process::exit(1);
    }

    init_logging();

    let output_dir = PathBuf::from(&args[1]);
    let mut inputs = Vec::new();
    let mut format = OutputFormat::Docx;
    let mut json = false;
    let mut examiner_title = None;

    // Parse options
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--pdf" => {
                format = OutputFormat::Pdf;
                i += 1;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            "--examiner-title" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --examiner-title requires a value");
                    process::exit(1);
                }
                examiner_title = Some(args[i + 1].clone());
                i += 2;
            }
            option if option.starts_with("--") => {
                eprintln!("Error: Unknown option: {}", option);
                process::exit(1);
            }
            path => {
                inputs.push(PathBuf::from(path));
                i += 1;
            }
        }
    }

    if let Err(e) = run(&output_dir, &inputs, format, json, examiner_title) {
        handle_error(e);
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(
    output_dir: &Path,
    inputs: &[PathBuf],
    format: OutputFormat,
    json: bool,
    examiner_title: Option<String>,
) -> Result<(), ReportError> {
    let mut builder = ReportBuilder::new().with_output_format(format);
    if let Some(title) = examiner_title {
        builder = builder.with_examiner_title(title);
    }
    let generator = builder.build()?;

    let files = inputs
        .iter()
        .map(|path| SourceFile::read(path))
        .collect::<Result<Vec<_>, _>>()?;

    // JSON mode: print records only
    if json {
        for file in &files {
            let records = generator.parse_source(file)?;
            for record in &records {
                println!("{}", record.to_json_pretty()?);
            }
        }
        return Ok(());
    }

    let outcome = generator.run_batch_with_progress(&files, |unit| {
        if unit.status() == UploadStatus::Complete {
            eprintln!("  ✓ {} ({} records)", unit.source_name(), unit.record_count());
        } else {
            eprintln!("  ✗ {}", unit.source_name());
        }
    })?;

    print!("{}", summary_to_string(&outcome)?);

    std::fs::create_dir_all(output_dir)?;
    match outcome.delivery.write_to_dir(output_dir)? {
        Some(path) => {
            let kind = match outcome.delivery {
                Delivery::Archive { .. } => "archive",
                _ => "report",
            };
            println!("\nWrote {}: {}", kind, path.display());
        }
        None => println!("\nNo reports generated"),
    }

    Ok(())
}

fn handle_error(error: ReportError) {
    match error {
        ReportError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        ReportError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        ReportError::EmptyInput | ReportError::NoValidRecords => {
            eprintln!("Input Error: {}", error);
            eprintln!("Please export the score file from Q-Global with a header row.");
        }
        ReportError::UnsupportedFormat { .. } => {
            eprintln!("{}", error);
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
}
