//! Extract command - build a canonical invoice from one document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use frota_core::{CanonicalInvoice, DocumentPayload, ExtractionResult, FieldSource, InvoiceFieldExtractor};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Service response (JSON) or OCR text file
    #[arg(required = true)]
    input: PathBuf,

    /// Treat the input as plain OCR text
    #[arg(long)]
    text: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show where each field value came from
    #[arg(long)]
    show_sources: bool,

    /// Print review warnings
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting invoice from {}", args.input.display());

    let payload = read_payload(&args.input, args.text)?;
    let extractor = InvoiceFieldExtractor::from_config(&config.extraction);
    let result = extractor.extract_detailed(&payload);

    if args.validate && !result.warnings.is_empty() {
        eprintln!("{}", style("Validation issues:").yellow());
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }

    let output = format_invoice(&result.invoice, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_sources {
        print_sources(&result);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read a document: `.txt` files and `--text` are OCR text, anything else
/// is a service response.
pub fn read_payload(path: &Path, as_text: bool) -> anyhow::Result<DocumentPayload> {
    let content = fs::read_to_string(path)?;

    let is_text = as_text
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    if is_text {
        return Ok(DocumentPayload::from_text(content));
    }

    Ok(DocumentPayload::from_json(&content)?)
}

fn print_sources(result: &ExtractionResult) {
    let count = |source: FieldSource| result.sources.values().filter(|s| **s == source).count();

    eprintln!();
    eprintln!(
        "{} {} from field bag, {} from raw text, {} derived, {} empty",
        style("ℹ").blue(),
        count(FieldSource::FieldBag),
        count(FieldSource::RawText),
        count(FieldSource::Derived),
        count(FieldSource::Default)
    );

    for (field, source) in &result.sources {
        let label = match source {
            FieldSource::FieldBag => style("field bag").green(),
            FieldSource::RawText => style("raw text").cyan(),
            FieldSource::Derived => style("derived").magenta(),
            FieldSource::Default => continue,
        };
        eprintln!("  {:<36} {}", field, label);
    }

    eprintln!("{} Processing time: {}ms", style("ℹ").blue(), result.processing_time_ms);
}

pub fn format_invoice(invoice: &CanonicalInvoice, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn format_csv(invoice: &CanonicalInvoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "numero",
        "serie",
        "chave_acesso",
        "data_emissao",
        "data_vencimento",
        "emitente",
        "emitente_cnpj_cpf",
        "destinatario",
        "destinatario_cnpj_cpf",
        "valor_total",
        "validation_status",
    ])?;

    let meta = &invoice.document_meta;
    let status = invoice.validation_status.to_string();
    wtr.write_record([
        meta.numero.as_str(),
        meta.serie.as_str(),
        meta.chave_acesso.as_str(),
        meta.data_emissao.as_str(),
        meta.data_vencimento.as_str(),
        invoice.sender.razao_social.as_str(),
        invoice.sender.cnpj_cpf.as_str(),
        invoice.recipient.razao_social.as_str(),
        invoice.recipient.cnpj_cpf.as_str(),
        invoice.amounts.valor_total.as_str(),
        status.as_str(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &CanonicalInvoice) -> String {
    let meta = &invoice.document_meta;
    let mut output = String::new();

    output.push_str(&format!("NF-e: {} série {}\n", meta.numero, meta.serie));
    if !meta.chave_acesso.is_empty() {
        output.push_str(&format!("Chave: {}\n", meta.chave_acesso));
    }
    output.push_str(&format!("Emissão: {}\n", meta.data_emissao));
    output.push('\n');

    for (title, party) in [
        ("Emitente", &invoice.sender),
        ("Destinatário", &invoice.recipient),
        ("Transportador", &invoice.carrier),
    ] {
        if party.is_empty() {
            continue;
        }
        output.push_str(&format!("{}:\n", title));
        output.push_str(&format!("  {}\n", party.razao_social));
        if !party.cnpj_cpf.is_empty() {
            output.push_str(&format!("  CNPJ/CPF: {}\n", party.cnpj_cpf));
        }
        if !party.municipio.is_empty() {
            output.push_str(&format!("  {} {}\n", party.municipio, party.uf));
        }
        output.push('\n');
    }

    if !invoice.line_items.is_empty() {
        output.push_str("Itens:\n");
        for item in &invoice.line_items {
            output.push_str(&format!(
                "  {} {} {} x {} = {}\n",
                item.codigo, item.descricao, item.quantidade, item.valor_unitario, item.valor_total
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!("Total: {}\n", invoice.amounts.valor_total));

    if !meta.data_vencimento.is_empty() {
        output.push_str(&format!("Vencimento: {}\n", meta.data_vencimento));
    }

    for installment in &invoice.installments {
        output.push_str(&format!(
            "  Parcela {}: {} em {}\n",
            installment.numero, installment.valor, installment.vencimento
        ));
    }

    output.push_str(&format!("Status: {}\n", invoice.validation_status));

    output
}
