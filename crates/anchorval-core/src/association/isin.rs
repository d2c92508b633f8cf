//! ISIN (International Securities Identification Number) extraction and validation.

/// Validate an ISIN check digit.
///
/// Algorithm:
/// 1. Replace letters with numbers (A=10, B=11, ..., Z=35)
/// 2. Double every second digit from the right, starting with the one
///    left of the check digit (Luhn)
/// 3. The digit sum including the check digit must be divisible by 10
pub fn validate_isin(isin: &str) -> bool {
    let isin = isin.trim().to_ascii_uppercase();

    if isin.len() != 12 || !isin.is_ascii() {
        return false;
    }
    if !isin[..2].chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    if !isin[2..].chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    if !isin[11..].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut digits = Vec::with_capacity(24);
    for c in isin.chars() {
        match c.to_digit(36) {
            Some(value) if value >= 10 => {
                digits.push(value / 10);
                digits.push(value % 10);
            }
            Some(value) => digits.push(value),
            None => return false,
        }
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                doubled / 10 + doubled % 10
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}
