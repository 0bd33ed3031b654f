//! Lifecycle of one document upload: idle, extracting, then populated or failed.

use std::fmt;

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::invoice::{CanonicalInvoice, ValidationStatus};

use super::extractor::{DocumentPayload, InvoiceFieldExtractor};

/// Where an extraction session stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionState {
    #[default]
    Idle,
    Extracting,
    Populated,
    Failed,
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionState::Idle => "idle",
            ExtractionState::Extracting => "extracting",
            ExtractionState::Populated => "populated",
            ExtractionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Explicit state machine around [`InvoiceFieldExtractor`].
///
/// `begin` is allowed from any state except `Extracting`; `complete` and
/// `fail` only from `Extracting`. Anything else returns
/// [`ExtractionError::InvalidTransition`] and leaves the session untouched.
#[derive(Debug, Clone, Default)]
pub struct ExtractionSession {
    extractor: InvoiceFieldExtractor,
    state: ExtractionState,
    invoice: Option<CanonicalInvoice>,
    error: Option<String>,
}

impl ExtractionSession {
    pub fn new(extractor: InvoiceFieldExtractor) -> Self {
        Self {
            extractor,
            ..Default::default()
        }
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Record of the last completed or failed extraction.
    pub fn invoice(&self) -> Option<&CanonicalInvoice> {
        self.invoice.as_ref()
    }

    /// Reason given to the last `fail`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn invalid(&self, action: &'static str) -> ExtractionError {
        ExtractionError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }

    /// Start a new extraction, discarding any previous record.
    pub fn begin(&mut self) -> Result<(), ExtractionError> {
        if self.state == ExtractionState::Extracting {
            return Err(self.invalid("begin"));
        }

        self.state = ExtractionState::Extracting;
        self.invoice = None;
        self.error = None;
        debug!("Extraction session started");
        Ok(())
    }

    /// Populate the record from a service payload.
    pub fn complete(
        &mut self,
        payload: &DocumentPayload,
    ) -> Result<&CanonicalInvoice, ExtractionError> {
        if self.state != ExtractionState::Extracting {
            return Err(self.invalid("complete"));
        }

        self.state = ExtractionState::Populated;
        Ok(self.invoice.insert(self.extractor.extract(payload)))
    }

    /// Give up on the document; the record is empty and needs review.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<&CanonicalInvoice, ExtractionError> {
        if self.state != ExtractionState::Extracting {
            return Err(self.invalid("fail"));
        }

        let reason = reason.into();
        warn!("Extraction failed: {}", reason);

        self.state = ExtractionState::Failed;
        self.error = Some(reason);
        Ok(self.invoice.insert(CanonicalInvoice {
            validation_status: ValidationStatus::RequiresReview,
            ..Default::default()
        }))
    }

    /// Back to `Idle` from any state.
    pub fn reset(&mut self) {
        self.state = ExtractionState::Idle;
        self.invoice = None;
        self.error = None;
    }
}
