use std::sync::OnceLock;

use regex::Regex;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap())
}

/// Canonical form of a customer identifier (email address or phone number).
///
/// Identifiers are trimmed and lower-cased. Phone numbers (anything without an `@`) also lose the spaces, dashes,
/// dots and parentheses people commonly type, so that `+254 (712) 345-678` and `+254712345678` are the same customer.
pub fn normalize_customer_id(raw: &str) -> String {
    let id = raw.trim().to_lowercase();
    if id.contains('@') {
        id
    } else {
        id.chars().filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')')).collect()
    }
}

/// The identifier used to track a customer: the phone number when one is supplied, otherwise the email.
pub fn customer_identifier(phone: Option<&str>, email: Option<&str>) -> Option<String> {
    let non_empty = |s: &&str| !s.trim().is_empty();
    phone.filter(non_empty).or(email.filter(non_empty)).map(normalize_customer_id)
}

/// Every identifier a customer can be known by, primary (as chosen by [`customer_identifier`]) first. Restrictions
/// are checked and recorded against all of them, so leaving out or adding a contact field does not escape one.
pub fn customer_identifiers(phone: Option<&str>, email: Option<&str>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(2);
    for id in [phone, email].into_iter().flatten().map(normalize_customer_id) {
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

/// Checks the *normalized* form of `phone`: an optional leading `+` followed by 7 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(&normalize_customer_id(phone))
}
