/// Canonical form of a currency / payment-method code: trimmed and upper-cased.
pub fn normalize_currency_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Parse a comma-separated list of currency codes, dropping empty entries.
pub fn parse_code_list(value: Option<String>) -> Vec<String> {
    let value = match value {
        Some(v) => v,
        None => return Vec::new(),
    };
    value.split(',').map(normalize_currency_code).filter(|s| !s.is_empty()).collect()
}
