//! CNPJ / CPF (Brazilian company and individual tax IDs).

use super::patterns::TAX_ID;
use super::{ExtractionMatch, FieldExtractor};

/// Finds CNPJ and CPF numbers in free text.
pub struct TaxIdExtractor {
    validate: bool,
}

impl TaxIdExtractor {
    pub fn new() -> Self {
        Self { validate: false }
    }

    /// Only accept numbers whose check digits are correct.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for TaxIdExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TaxIdExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for caps in TAX_ID.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let digits = digits_of(m.as_str());

            if results.iter().any(|r| r.value == digits) {
                continue;
            }

            if self.validate && !validate_tax_id(&digits) {
                continue;
            }

            let confidence = if validate_tax_id(&digits) { 0.9 } else { 0.6 };
            results.push(
                ExtractionMatch::new(digits, confidence, m.as_str())
                    .with_position(m.start(), m.end()),
            );
        }

        results
    }
}

fn digits_of(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a CNPJ/CPF: 14 digits become `##.###.###/####-##`, 11 digits
/// become `###.###.###-##`, other digit counts are returned bare, and input
/// without digits comes back trimmed.
pub fn normalize_tax_id(value: &str) -> String {
    let digits = digits_of(value);

    match digits.len() {
        0 => value.trim().to_string(),
        14 => format_cnpj(&digits),
        11 => format_cpf(&digits),
        _ => digits,
    }
}

/// Format 14 digits as a CNPJ. Anything else is returned unchanged.
pub fn format_cnpj(cnpj: &str) -> String {
    let d = digits_of(cnpj);
    if d.len() != 14 {
        return cnpj.to_string();
    }

    format!(
        "{}.{}.{}/{}-{}",
        &d[0..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..14]
    )
}

/// Format 11 digits as a CPF. Anything else is returned unchanged.
pub fn format_cpf(cpf: &str) -> String {
    let d = digits_of(cpf);
    if d.len() != 11 {
        return cpf.to_string();
    }

    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

/// Mod-11 check digit as used by CNPJ and CPF.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

fn to_digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Validate a CNPJ using its two check digits.
pub fn validate_cnpj(cnpj: &str) -> bool {
    let digits = to_digits(cnpj);
    if digits.len() != 14 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    check_digit(&digits[..12], &W1) == digits[12] && check_digit(&digits[..13], &W2) == digits[13]
}

/// Validate a CPF using its two check digits.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits = to_digits(cpf);
    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    const W1: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

    check_digit(&digits[..9], &W1) == digits[9] && check_digit(&digits[..10], &W2) == digits[10]
}

/// Validate either kind, chosen by digit count.
pub fn validate_tax_id(value: &str) -> bool {
    match to_digits(value).len() {
        14 => validate_cnpj(value),
        11 => validate_cpf(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_tax_id() {
        assert_eq!(normalize_tax_id("11222333000181"), "11.222.333/0001-81");
        assert_eq!(normalize_tax_id("11.222.333/0001-81"), "11.222.333/0001-81");
        assert_eq!(normalize_tax_id("529.982.247-25"), "529.982.247-25");
        assert_eq!(normalize_tax_id("52998224725"), "529.982.247-25");
        assert_eq!(normalize_tax_id("12-345"), "12345");
        assert_eq!(normalize_tax_id("  ISENTO "), "ISENTO");
    }

    #[test]
    fn test_cnpj_format_roundtrip() {
        let formatted = format_cnpj("11222333000181");
        let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(normalize_tax_id(&digits), formatted);
        assert_eq!(normalize_tax_id(&formatted), formatted);
    }

    #[test]
    fn test_validate_cnpj() {
        assert!(validate_cnpj("11.222.333/0001-81"));
        assert!(!validate_cnpj("11.222.333/0001-82"));
        assert!(!validate_cnpj("00000000000000"));
        assert!(!validate_cnpj("1122233300018"));
    }

    #[test]
    fn test_validate_cpf() {
        assert!(validate_cpf("529.982.247-25"));
        assert!(!validate_cpf("529.982.247-24"));
        assert!(!validate_cpf("111.111.111-11"));
    }

    #[test]
    fn test_extract_tax_ids() {
        let text = "Emitente CNPJ 11.222.333/0001-81\nDestinatário CPF 529.982.247-25\nCNPJ 11222333000181";
        let results = TaxIdExtractor::new().extract_all(text);

        let values: Vec<&str> = results.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["11222333000181", "52998224725"]);
        assert_eq!(results[0].confidence, 0.9);
    }

    #[test]
    fn test_extract_with_validation_skips_bad_checksums() {
        let text = "CNPJ 11.222.333/0001-82 e 11.222.333/0001-81";
        let found = TaxIdExtractor::new().with_validation(true).extract(text);
        assert_eq!(found.map(|m| m.value), Some("11222333000181".to_string()));
    }
}
