//! WASM bindings for NF-e invoice extraction and driver movement classification.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;

use frota_core::invoice::rules;
use frota_core::{
    DocumentPayload, DriverLocation, InvoiceFieldExtractor, LocationSample, MovementClassifier,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// A string is OCR text; an object is a service response.
fn payload_from_js(payload: JsValue) -> Result<DocumentPayload, JsValue> {
    if let Some(text) = payload.as_string() {
        return Ok(DocumentPayload::from_text(text));
    }

    serde_wasm_bindgen::from_value(payload).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Reference instant: `now_ms` (epoch milliseconds) or the JS clock.
fn instant(now_ms: Option<f64>) -> Result<DateTime<Utc>, JsValue> {
    let ms = now_ms.unwrap_or_else(js_sys::Date::now);
    DateTime::from_timestamp_millis(ms as i64)
        .ok_or_else(|| JsValue::from_str(&format!("timestamp out of range: {}", ms)))
}

/// Extract a canonical invoice from OCR text or a service response object.
#[wasm_bindgen(js_name = extractInvoice)]
pub fn extract_invoice(payload: JsValue) -> Result<JsValue, JsValue> {
    let payload = payload_from_js(payload)?;
    to_js(&InvoiceFieldExtractor::new().extract(&payload))
}

/// Classify one location report as `"moving"` or `"stopped"`.
#[wasm_bindgen(js_name = classifyMovement)]
pub fn classify_movement(
    speed: Option<f64>,
    last_update: Option<String>,
    now_ms: Option<f64>,
) -> Result<String, JsValue> {
    let sample = LocationSample::new(speed, last_update.as_deref());
    let status = MovementClassifier::new().classify(&sample, instant(now_ms)?);
    Ok(status.as_str().to_string())
}

/// Classify an array of tracking records.
#[wasm_bindgen(js_name = classifyFleet)]
pub fn classify_fleet(drivers: JsValue, now_ms: Option<f64>) -> Result<JsValue, JsValue> {
    let drivers: Vec<DriverLocation> =
        serde_wasm_bindgen::from_value(drivers).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&MovementClassifier::new().classify_fleet(&drivers, instant(now_ms)?))
}

/// Normalize a currency value to `1234.56`.
#[wasm_bindgen(js_name = normalizeCurrency)]
pub fn normalize_currency(value: &str) -> String {
    rules::normalize_currency(value)
}

/// Normalize a CNPJ or CPF to its punctuated form.
#[wasm_bindgen(js_name = normalizeTaxId)]
pub fn normalize_tax_id(value: &str) -> String {
    rules::normalize_tax_id(value)
}

/// Normalize a date to `YYYY-MM-DD`.
#[wasm_bindgen(js_name = normalizeDate)]
pub fn normalize_date(value: &str) -> String {
    rules::normalize_date(value)
}

/// Check a CNPJ or CPF check digits.
#[wasm_bindgen(js_name = validateTaxId)]
pub fn validate_tax_id(value: &str) -> bool {
    rules::validate_tax_id(value)
}

/// Check a 44-digit NF-e access key.
#[wasm_bindgen(js_name = validateAccessKey)]
pub fn validate_access_key(value: &str) -> bool {
    rules::validate_access_key(value)
}

/// Format an amount Brazilian style (1.234,56). Unparsable input gives an empty string.
#[wasm_bindgen(js_name = formatBrl)]
pub fn format_brl(value: &str) -> String {
    rules::parse_amount(value)
        .map(rules::format_brl)
        .unwrap_or_default()
}

/// Invoice extractor class for browser use.
#[wasm_bindgen]
pub struct InvoiceExtractor {
    extractor: InvoiceFieldExtractor,
}

#[wasm_bindgen]
impl InvoiceExtractor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            extractor: InvoiceFieldExtractor::new(),
        }
    }

    /// Days added to the issue date when no due date is present.
    #[wasm_bindgen(js_name = setPaymentTermDays)]
    pub fn set_payment_term_days(&mut self, days: u32) {
        self.extractor = self.extractor.clone().with_payment_term_days(days);
    }

    /// Flag records whose service confidence is below `confidence`.
    #[wasm_bindgen(js_name = setMinConfidence)]
    pub fn set_min_confidence(&mut self, confidence: f64) {
        self.extractor = self.extractor.clone().with_min_confidence(confidence);
    }

    /// Extract the canonical invoice.
    #[wasm_bindgen]
    pub fn extract(&self, payload: JsValue) -> Result<JsValue, JsValue> {
        let payload = payload_from_js(payload)?;
        to_js(&self.extractor.extract(&payload))
    }

    /// Extract with warnings, per-field sources and timing.
    #[wasm_bindgen(js_name = extractWithMetadata)]
    pub fn extract_with_metadata(&self, payload: JsValue) -> Result<JsValue, JsValue> {
        let payload = payload_from_js(payload)?;
        to_js(&self.extractor.extract_detailed(&payload))
    }
}

impl Default for InvoiceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    // 2024-01-01T00:15:00Z
    const QUARTER_PAST: f64 = 1_704_068_100_000.0;

    #[wasm_bindgen_test]
    fn test_classify_movement() {
        let stopped = classify_movement(Some(0.0), Some("2024-01-01T00:00:00Z".into()), Some(QUARTER_PAST));
        assert_eq!(stopped.unwrap(), "stopped");

        let moving = classify_movement(Some(40.0), None, Some(QUARTER_PAST));
        assert_eq!(moving.unwrap(), "moving");

        let unknown = classify_movement(None, None, Some(QUARTER_PAST));
        assert_eq!(unknown.unwrap(), "moving");
    }

    #[wasm_bindgen_test]
    fn test_normalizers() {
        assert_eq!(normalize_currency("R$ 1.234,56"), "1234.56");
        assert_eq!(normalize_tax_id("11222333000181"), "11.222.333/0001-81");
        assert_eq!(normalize_date("01/02/2024"), "2024-02-01");
        assert_eq!(format_brl("1234.5"), "1.234,50");
    }

    #[wasm_bindgen_test]
    fn test_validators() {
        assert!(validate_tax_id("11.222.333/0001-81"));
        assert!(!validate_tax_id("11.222.333/0001-82"));
    }
}
