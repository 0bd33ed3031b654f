//! Invoice field extraction module.

mod extractor;
pub mod rules;
mod session;

pub use extractor::{
    normalize_value, DocumentPayload, ExtractionResult, FieldSource, InvoiceFieldExtractor,
};
pub use session::{ExtractionSession, ExtractionState};
