//! Invoice field extraction: raw text and field bag into a canonical record.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{FrotaError, Result};
use crate::models::config::ExtractionConfig;
use crate::models::field_bag::RawFieldBag;
use crate::models::invoice::{CanonicalInvoice, Field, FieldKind, MetaField, ValidationStatus};

use super::rules::{
    aliases, due_date_from_issue, extract_text_fields, line_items_from_bag, line_items_from_text,
    normalize_access_key, normalize_currency, normalize_date, normalize_tax_id, FieldExtractor,
    InstallmentExtractor,
};

/// Response of a document-understanding service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentPayload {
    /// OCR text of the whole document.
    #[serde(alias = "raw_text", alias = "text")]
    pub raw_text: Option<String>,

    /// Labeled values, when the processor returns them.
    #[serde(alias = "rawFieldBag", alias = "raw_fields", alias = "raw_field_bag")]
    pub raw_fields: Option<RawFieldBag>,

    /// Document-AI style entities. `null` means none.
    #[serde(deserialize_with = "lenient_entities")]
    pub entities: Vec<Value>,

    /// Overall confidence reported by the service.
    pub confidence: Option<f64>,
}

/// Accept an array of entities; `null` or any other shape counts as none.
fn lenient_entities<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(entities)) => entities,
        _ => Vec::new(),
    })
}

impl DocumentPayload {
    /// Payload carrying only OCR text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Decode a service response.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FrotaError::Payload(e.to_string()))
    }

    pub fn with_fields(mut self, fields: RawFieldBag) -> Self {
        self.raw_fields = Some(fields);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Where a field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    FieldBag,
    RawText,
    Derived,
    Default,
}

/// Result of invoice extraction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Extracted invoice data.
    pub invoice: CanonicalInvoice,
    /// Gaps a reviewer should look at.
    pub warnings: Vec<String>,
    /// Origin of every scalar field, keyed by dotted path.
    pub sources: BTreeMap<String, FieldSource>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Normalize a merged value according to its field kind.
pub fn normalize_value(kind: FieldKind, value: &str) -> String {
    match kind {
        FieldKind::Text => value.trim().to_string(),
        FieldKind::Currency => normalize_currency(value),
        FieldKind::TaxId => normalize_tax_id(value),
        FieldKind::Date => normalize_date(value),
        FieldKind::AccessKey => normalize_access_key(value),
    }
}

/// Builds canonical invoice records from service payloads.
///
/// Field-bag values win over raw-text matches for every field; whatever
/// neither provides stays an empty string.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFieldExtractor {
    config: ExtractionConfig,
}

impl InvoiceFieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Days between issue and derived due date.
    pub fn with_payment_term_days(mut self, days: u32) -> Self {
        self.config.payment_term_days = days;
        self
    }

    /// Flag records below this service confidence for review.
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.config.min_confidence = Some(confidence);
        self
    }

    pub fn with_text_line_items(mut self, enabled: bool) -> Self {
        self.config.text_line_items = enabled;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extract(&self, payload: &DocumentPayload) -> CanonicalInvoice {
        self.extract_detailed(payload).invoice
    }

    /// Extract from OCR text alone.
    pub fn extract_from_text(&self, text: &str) -> CanonicalInvoice {
        self.extract(&DocumentPayload::from_text(text))
    }

    /// Extract and report where each value came from.
    pub fn extract_detailed(&self, payload: &DocumentPayload) -> ExtractionResult {
        let start = Instant::now();
        let raw_text = payload.raw_text.as_deref().unwrap_or_default();

        let bag = match &payload.raw_fields {
            Some(fields) => Some(fields.clone()),
            None if !payload.entities.is_empty() => {
                Some(RawFieldBag::from_entities(&payload.entities))
            }
            None => None,
        };

        info!(
            "Extracting invoice from {} characters of text and {} field labels",
            raw_text.len(),
            bag.as_ref().map_or(0, RawFieldBag::len)
        );

        let text_fields = extract_text_fields(raw_text);
        let mut invoice = CanonicalInvoice::new();
        let mut sources = BTreeMap::new();

        for field in Field::all() {
            let from_bag = bag.as_ref().and_then(|b| b.first_non_empty(aliases(field)));

            let (value, source) = match (from_bag, text_fields.get(&field)) {
                (Some(value), _) => (value, FieldSource::FieldBag),
                (None, Some(value)) => (value.as_str(), FieldSource::RawText),
                (None, None) => ("", FieldSource::Default),
            };

            *invoice.field_mut(field) = normalize_value(field.kind(), value);
            sources.insert(field.to_string(), source);
        }

        if invoice.document_meta.data_vencimento.is_empty() {
            let due = due_date_from_issue(
                &invoice.document_meta.data_emissao,
                self.config.payment_term_days,
            );
            if !due.is_empty() {
                invoice.document_meta.data_vencimento = due;
                sources.insert(
                    Field::Meta(MetaField::DataVencimento).to_string(),
                    FieldSource::Derived,
                );
            }
        }

        invoice.installments = InstallmentExtractor::new()
            .with_window_chars(self.config.installment_window_chars)
            .extract_all(raw_text)
            .into_iter()
            .map(|m| m.value)
            .collect();

        invoice.line_items = bag.as_ref().map(line_items_from_bag).unwrap_or_default();
        if invoice.line_items.is_empty() && self.config.text_line_items {
            invoice.line_items = line_items_from_text(raw_text);
        }

        invoice.raw_text = payload.raw_text.clone().unwrap_or_default();
        invoice.raw_field_bag = bag.unwrap_or_default();
        invoice.extraction_confidence = payload.confidence;
        invoice.entities = payload.entities.clone();

        let mut warnings = invoice.validate();

        invoice.validation_status = match self.config.min_confidence {
            Some(min) if !matches!(payload.confidence, Some(c) if c >= min) => {
                warnings.push(match payload.confidence {
                    Some(c) => format!("Confidence {:.2} is below {:.2}", c, min),
                    None => "No confidence reported".to_string(),
                });
                ValidationStatus::RequiresReview
            }
            _ => ValidationStatus::Valid,
        };

        debug!(
            "Extracted invoice '{}' with {} installments, {} line items, {} warnings",
            invoice.document_meta.numero,
            invoice.installments.len(),
            invoice.line_items.len(),
            warnings.len()
        );

        ExtractionResult {
            invoice,
            warnings,
            sources,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_end_to_end_example() {
        let payload = DocumentPayload::from_text("Série 1 Data de Emissão 01/02/2024").with_fields(
            RawFieldBag::new()
                .with("invoice_id", ["000123"])
                .with("supplier_name", ["ACME LTDA"]),
        );

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.document_meta.numero, "000123");
        assert_eq!(invoice.sender.razao_social, "ACME LTDA");
        assert_eq!(invoice.document_meta.serie, "1");
        assert_eq!(invoice.document_meta.data_emissao, "2024-02-01");
        assert_eq!(invoice.document_meta.data_vencimento, "2024-03-02");
        assert_eq!(invoice.recipient.razao_social, "");
        assert_eq!(invoice.validation_status, ValidationStatus::Valid);
    }

    #[test]
    fn test_field_bag_beats_raw_text() {
        let payload = DocumentPayload::from_text("NF-e Nº 123 Série 2")
            .with_fields(RawFieldBag::new().with("nro", ["999"]));

        let result = InvoiceFieldExtractor::new().extract_detailed(&payload);

        assert_eq!(result.invoice.document_meta.numero, "999");
        assert_eq!(result.invoice.document_meta.serie, "2");
        assert_eq!(result.sources["documentMeta.numero"], FieldSource::FieldBag);
        assert_eq!(result.sources["documentMeta.serie"], FieldSource::RawText);
        assert_eq!(result.sources["carrier.uf"], FieldSource::Default);
    }

    #[test]
    fn test_values_are_normalized_by_kind() {
        let payload = DocumentPayload::default().with_fields(
            RawFieldBag::new()
                .with("total_amount", ["R$ 1.234,5"])
                .with("supplier_tax_id", ["11222333000181"])
                .with("invoice_date", ["2024-03-15T10:00:00Z"])
                .with("access_key", ["3524 0112 3456 7800 0199 5500 1000 0012 3410 0001 2345"])
                .with("receiver_name", ["  Cliente  "]),
        );

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.amounts.valor_total, "1234.50");
        assert_eq!(invoice.sender.cnpj_cpf, "11.222.333/0001-81");
        assert_eq!(invoice.document_meta.data_emissao, "2024-03-15");
        assert_eq!(
            invoice.document_meta.chave_acesso,
            "35240112345678000199550010000012341000012345"
        );
        assert_eq!(invoice.recipient.razao_social, "Cliente");
    }

    #[test]
    fn test_due_date_kept_or_derived() {
        let extractor = InvoiceFieldExtractor::new();

        let explicit = extractor.extract_detailed(&DocumentPayload::from_text(
            "Data de Emissão 01/02/2024\nVencimento 10/02/2024",
        ));
        assert_eq!(explicit.invoice.document_meta.data_vencimento, "2024-02-10");
        assert_eq!(explicit.sources["documentMeta.dataVencimento"], FieldSource::RawText);

        let derived = extractor.extract_detailed(&DocumentPayload::from_text(
            "Data de Emissão 15/12/2024",
        ));
        assert_eq!(derived.invoice.document_meta.data_vencimento, "2025-01-14");
        assert_eq!(derived.sources["documentMeta.dataVencimento"], FieldSource::Derived);

        let custom = extractor
            .clone()
            .with_payment_term_days(10)
            .extract_from_text("Data de Emissão 01/02/2024");
        assert_eq!(custom.document_meta.data_vencimento, "2024-02-11");
    }

    #[test]
    fn test_invalid_issue_date_gives_no_due_date() {
        let payload = DocumentPayload::default()
            .with_fields(RawFieldBag::new().with("invoice_date", ["31/02/2024"]));

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.document_meta.data_emissao, "31/02/2024");
        assert_eq!(invoice.document_meta.data_vencimento, "");
    }

    #[test]
    fn test_entities_build_the_field_bag() {
        let payload = DocumentPayload {
            entities: vec![
                json!({"type": "invoice_id", "mentionText": "42"}),
                json!({"type": "total_amount", "mentionText": "R$ 10,00", "normalizedValue": {"text": "10.00"}}),
            ],
            ..Default::default()
        };

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.document_meta.numero, "42");
        assert_eq!(invoice.amounts.valor_total, "10.00");
        assert_eq!(invoice.raw_field_bag.get("invoice_id"), Some(&[Some("42".to_string())][..]));
        assert_eq!(invoice.entities.len(), 2);
    }

    #[test]
    fn test_payload_carried_verbatim() {
        let text = "  Nº 7 \n";
        let bag = RawFieldBag::new().with("foo", ["bar"]);
        let payload = DocumentPayload::from_text(text)
            .with_fields(bag.clone())
            .with_confidence(0.93);

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.raw_text, text);
        assert_eq!(invoice.raw_field_bag, bag);
        assert_eq!(invoice.extraction_confidence, Some(0.93));
    }

    #[test]
    fn test_confidence_gate() {
        let gated = InvoiceFieldExtractor::new().with_min_confidence(0.8);

        let low = DocumentPayload::from_text("Nº 1").with_confidence(0.5);
        let result = gated.extract_detailed(&low);
        assert_eq!(result.invoice.validation_status, ValidationStatus::RequiresReview);
        assert!(result.warnings.iter().any(|w| w.contains("below")));

        let missing = DocumentPayload::from_text("Nº 1");
        assert_eq!(gated.extract(&missing).validation_status, ValidationStatus::RequiresReview);

        let high = DocumentPayload::from_text("Nº 1").with_confidence(0.9);
        assert_eq!(gated.extract(&high).validation_status, ValidationStatus::Valid);

        assert_eq!(
            InvoiceFieldExtractor::new().extract(&low).validation_status,
            ValidationStatus::Valid
        );
    }

    #[test]
    fn test_line_items_prefer_bag_then_text() {
        let text = "P001 Parafuso 73181500 000 5102 UN 10 2,50 25,00";

        let from_text = InvoiceFieldExtractor::new().extract_from_text(text);
        assert_eq!(from_text.line_items.len(), 1);
        assert_eq!(from_text.line_items[0].codigo, "P001");

        let payload = DocumentPayload::from_text(text).with_fields(
            RawFieldBag::new().with("line_item/description", ["Serviço de frete"]),
        );
        let from_bag = InvoiceFieldExtractor::new().extract(&payload);
        assert_eq!(from_bag.line_items.len(), 1);
        assert_eq!(from_bag.line_items[0].descricao, "Serviço de frete");

        let disabled = InvoiceFieldExtractor::new()
            .with_text_line_items(false)
            .extract_from_text(text);
        assert!(disabled.line_items.is_empty());
    }

    #[test]
    fn test_installments_from_text() {
        let text = "Data de Emissão 01/02/2024\nDup. 001 01/03/2024 R$ 590,00\nDup. 002 01/04/2024 R$ 590,00";
        let invoice = InvoiceFieldExtractor::new().extract_from_text(text);

        assert_eq!(invoice.installments.len(), 2);
        assert_eq!(invoice.installments[1].numero, "002");
        assert_eq!(invoice.installments[1].vencimento, "2024-04-01");
        assert_eq!(invoice.installments[1].valor, "590.00");
    }

    #[test]
    fn test_warnings_list_missing_key_fields() {
        let result = InvoiceFieldExtractor::new().extract_detailed(&DocumentPayload::default());

        assert!(result.warnings.contains(&"Missing invoice number".to_string()));
        assert!(result.warnings.contains(&"Missing issue date".to_string()));
        assert!(result.warnings.contains(&"Missing sender CNPJ/CPF".to_string()));
        assert!(result.warnings.contains(&"Missing invoice total".to_string()));
        assert_eq!(result.invoice.raw_text, "");
    }

    #[test]
    fn test_null_entities_from_failed_service() {
        let payload = DocumentPayload::from_json(r#"{"rawText": "Nº 5", "entities": null}"#).unwrap();
        assert!(payload.entities.is_empty());

        let invoice = InvoiceFieldExtractor::new().extract(&payload);
        assert_eq!(invoice.document_meta.numero, "5");
        assert!(invoice.entities.is_empty());

        let odd = DocumentPayload::from_json(r#"{"entities": {"type": "x"}}"#).unwrap();
        assert!(odd.entities.is_empty());
    }

    #[test]
    fn test_sub_unit_prices_keep_their_scale() {
        let payload = DocumentPayload::default().with_fields(
            RawFieldBag::new()
                .with("line_item/description", ["Arruela", "Porca"])
                .with("line_item/unit_price", ["0.125", "1.234"]),
        );

        let invoice = InvoiceFieldExtractor::new().extract(&payload);

        assert_eq!(invoice.line_items[0].valor_unitario, "0.13");
        assert_eq!(invoice.line_items[1].valor_unitario, "1234.00");
    }

    #[test]
    fn test_payload_json_aliases() {
        let a = DocumentPayload::from_json(r#"{"rawText": "x", "rawFieldBag": {"nro": "5"}}"#).unwrap();
        let b = DocumentPayload::from_json(r#"{"raw_text": "x", "raw_fields": {"nro": ["5"]}}"#).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.raw_fields.unwrap().first_non_empty(&["nro"]), Some("5"));
        assert!(matches!(
            DocumentPayload::from_json("not json"),
            Err(FrotaError::Payload(_))
        ));
    }
}
