//! Core library for fleet operations.
//!
//! This crate provides:
//! - Driver movement classification from tracking heartbeats
//! - NF-e (DANFE) invoice field extraction from OCR text and Document-AI field bags
//! - Normalizers for currency, CNPJ/CPF and dates
//! - Configuration and session storage shared by the CLI and WASM front ends

pub mod error;
pub mod models;
pub mod tracking;
pub mod invoice;
pub mod session;

pub use error::{FrotaError, Result};
pub use models::invoice::{
    Amounts, CanonicalInvoice, DocumentMeta, Field, FieldKind, Installment, LineItem, LineItemRaw,
    PackageInfo, Party, PartyRole, TaxDetail, ValidationStatus,
};
pub use models::field_bag::RawFieldBag;
pub use models::tracking::{DriverLocation, LocationSample, MovementStatus};
pub use models::config::FrotaConfig;
pub use tracking::{classify_fleet, compute_movement_status, FleetSnapshot, MovementClassifier};
pub use invoice::{
    DocumentPayload, ExtractionResult, ExtractionSession, ExtractionState, FieldSource,
    InvoiceFieldExtractor,
};
pub use session::{CachedSessionStore, FileSessionStore, MemorySessionStore, Session, SessionStore};
