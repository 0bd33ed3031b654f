//! Payment installments (duplicatas) read from text windows.

use super::amounts::{format_amount, AmountExtractor};
use super::dates::DateExtractor;
use super::patterns::{DATE_DMY, INSTALLMENT_MARKER};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::Installment;

/// Finds installments after `parcela`, `duplicata` or `dup.` markers.
///
/// Each marker opens a window that ends at the next marker or after
/// `window_chars` characters. A window yields an installment when it holds
/// both an amount and a `DD/MM/YYYY` date; the first of each is used.
pub struct InstallmentExtractor {
    window_chars: usize,
}

impl InstallmentExtractor {
    pub fn new() -> Self {
        Self { window_chars: 160 }
    }

    pub fn with_window_chars(mut self, window_chars: usize) -> Self {
        self.window_chars = window_chars;
        self
    }

    /// Byte offset `chars` characters after `start`, clamped to the text.
    fn window_end(&self, text: &str, start: usize) -> usize {
        text[start..]
            .char_indices()
            .nth(self.window_chars)
            .map(|(offset, _)| start + offset)
            .unwrap_or(text.len())
    }
}

impl Default for InstallmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InstallmentExtractor {
    type Output = ExtractionMatch<Installment>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let starts: Vec<usize> = INSTALLMENT_MARKER.find_iter(text).map(|m| m.start()).collect();
        let amounts = AmountExtractor::new();
        let dates = DateExtractor::new();
        let mut results = Vec::new();

        for (i, start) in starts.iter().enumerate() {
            let limit = self.window_end(text, *start);
            let end = starts.get(i + 1).map_or(limit, |next| (*next).min(limit));
            let window = &text[*start..end];

            let Some(due) = dates.extract(window) else {
                continue;
            };
            // dates out of the way so "15/03" is never read as an amount
            let without_dates = DATE_DMY.replace_all(window, " ");
            let Some(amount) = amounts.extract(&without_dates) else {
                continue;
            };

            let installment = Installment {
                numero: format!("{:03}", results.len() + 1),
                valor: format_amount(amount.value),
                vencimento: due.value.format("%Y-%m-%d").to_string(),
                origem: window.lines().next().unwrap_or_default().trim().to_string(),
            };

            results.push(ExtractionMatch::new(installment, 0.8, window).with_position(*start, end));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<Installment> {
        InstallmentExtractor::new()
            .extract_all(text)
            .into_iter()
            .map(|m| m.value)
            .collect()
    }

    #[test]
    fn test_one_installment_per_marker() {
        let text = "FATURA\nParcela 1 Venc. 15/03/2024 Valor R$ 500,00\nParcela 2 Venc. 15/04/2024 Valor R$ 680,00\n";
        let found = extract(text);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].numero, "001");
        assert_eq!(found[0].valor, "500.00");
        assert_eq!(found[0].vencimento, "2024-03-15");
        assert_eq!(found[0].origem, "Parcela 1 Venc. 15/03/2024 Valor R$ 500,00");
        assert_eq!(found[1].numero, "002");
        assert_eq!(found[1].valor, "680.00");
        assert_eq!(found[1].vencimento, "2024-04-15");
    }

    #[test]
    fn test_window_without_amount_or_date_is_skipped() {
        let text = "Duplicata sem valor\nDup. 001 10/05/2024 1.250,75";
        let found = extract(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].numero, "001");
        assert_eq!(found[0].valor, "1250.75");
        assert_eq!(found[0].vencimento, "2024-05-10");
    }

    #[test]
    fn test_window_is_bounded() {
        let filler = "x".repeat(200);
        let text = format!("Parcela 1 {} 15/03/2024 500,00", filler);

        assert!(extract(&text).is_empty());

        let wide = InstallmentExtractor::new().with_window_chars(400);
        assert_eq!(wide.extract_all(&text).len(), 1);
    }

    #[test]
    fn test_window_respects_multibyte_text() {
        let text = format!("Parcela única {} 15/03/2024 500,00", "ç".repeat(10));
        let found = InstallmentExtractor::new().with_window_chars(20).extract_all(&text);
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_markers() {
        assert!(extract("Valor total 500,00 em 15/03/2024").is_empty());
    }
}
