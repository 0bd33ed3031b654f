//! Batch command - extract many invoices matched by a glob.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use frota_core::{CanonicalInvoice, InvoiceFieldExtractor};

use super::extract::{format_invoice, read_payload, OutputFormat};
use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of service responses (.json) or OCR texts (.txt)
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    invoice: Option<CanonicalInvoice>,
    warnings: usize,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "json" | "txt")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let extractor = InvoiceFieldExtractor::from_config(&config.extraction);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = read_payload(&path, false).map(|payload| extractor.extract_detailed(&payload));
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(extracted) => {
                results.push(ProcessResult {
                    path,
                    invoice: Some(extracted.invoice),
                    warnings: extracted.warnings.len(),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        invoice: None,
                        warnings: 0,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    let successful: Vec<_> = results.iter().filter(|r| r.invoice.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let Some(invoice) = &result.invoice else {
                continue;
            };

            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_invoice(invoice, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "numero",
        "data_emissao",
        "emitente",
        "emitente_cnpj_cpf",
        "valor_total",
        "validation_status",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let time = result.processing_time_ms.to_string();

        if let Some(invoice) = &result.invoice {
            let status = invoice.validation_status.to_string();
            let warnings = result.warnings.to_string();
            wtr.write_record([
                filename,
                "success",
                invoice.document_meta.numero.as_str(),
                invoice.document_meta.data_emissao.as_str(),
                invoice.sender.razao_social.as_str(),
                invoice.sender.cnpj_cpf.as_str(),
                invoice.amounts.valor_total.as_str(),
                status.as_str(),
                warnings.as_str(),
                time.as_str(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                time.as_str(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
