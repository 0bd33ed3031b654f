//! NF-e access key (chave de acesso), 44 digits.

/// Strip spaces and punctuation from an access key.
///
/// Returns the digits when there are exactly 44 of them, otherwise the
/// trimmed input.
pub fn normalize_access_key(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 44 {
        digits
    } else {
        value.trim().to_string()
    }
}

/// Check the mod-11 verifier digit of an access key.
pub fn validate_access_key(key: &str) -> bool {
    let digits: Vec<u32> = key.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 44 {
        return false;
    }

    // weights 2..=9 cycling from the rightmost body digit
    let sum: u32 = digits[..43]
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| d * (2 + (i as u32 % 8)))
        .sum();

    let rest = sum % 11;
    let expected = if rest < 2 { 0 } else { 11 - rest };
    expected == digits[43]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const KEY: &str = "35240112345678000199550010000012341000012345";

    fn with_verifier(body: &str) -> String {
        for d in 0..10 {
            let candidate = format!("{}{}", body, d);
            if validate_access_key(&candidate) {
                return candidate;
            }
        }
        panic!("no verifier digit for {}", body);
    }

    #[test]
    fn test_normalize_strips_spaces() {
        let spaced = "3524 0112 3456 7800 0199 5500 1000 0012 3410 0001 2345";
        assert_eq!(normalize_access_key(spaced), KEY);
    }

    #[test]
    fn test_normalize_keeps_wrong_length() {
        assert_eq!(normalize_access_key(" 1234 5678 "), "1234 5678");
        assert_eq!(normalize_access_key(""), "");
    }

    #[test]
    fn test_validate_verifier_digit() {
        let key = with_verifier(&KEY[..43]);
        assert!(validate_access_key(&key));

        let last = key.chars().last().and_then(|c| c.to_digit(10)).unwrap();
        let wrong = format!("{}{}", &key[..43], (last + 1) % 10);
        assert!(!validate_access_key(&wrong));
        assert!(!validate_access_key("123"));
    }
}
