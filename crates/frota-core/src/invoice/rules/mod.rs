//! Rule-based field extractors for Brazilian NF-e / DANFE documents.

pub mod access_key;
pub mod aliases;
pub mod amounts;
pub mod dates;
pub mod installments;
pub mod line_items;
pub mod patterns;
pub mod tax_id;
pub mod text_fields;

pub use access_key::{normalize_access_key, validate_access_key};
pub use aliases::aliases;
pub use amounts::{format_amount, format_brl, normalize_currency, parse_amount, AmountExtractor};
pub use dates::{due_date_from_issue, normalize_date, parse_date, DateExtractor};
pub use installments::InstallmentExtractor;
pub use line_items::{line_items_from_bag, line_items_from_text};
pub use tax_id::{format_cnpj, format_cpf, normalize_tax_id, validate_tax_id, TaxIdExtractor};
pub use text_fields::{extract_text_fields, split_sections, Sections};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value found in text, with where and how sure.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte range in the source text.
    pub position: Option<(usize, usize)>,
    /// Text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
