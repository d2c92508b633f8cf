//! Locale-aware amount parsing and formatting.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::LocaleNumericProfile;
use crate::association::patterns::CURRENCY_SYMBOLS;

/// Parse a raw amount token (e.g. `"1'234'567.50 CHF"`) under a profile.
///
/// Returns `None` when the token cannot be read unambiguously:
/// - the decimal separator appears more than once, or is not followed by
///   exactly one or two digits;
/// - thousands groups are not `d{1,3}` followed by `ddd` groups;
/// - any other character remains after stripping a currency marker.
pub fn parse_amount(raw: &str, profile: &LocaleNumericProfile) -> Option<Decimal> {
    let body = raw.trim_matches(|c: char| {
        c.is_whitespace() || c.is_alphabetic() || CURRENCY_SYMBOLS.contains(&c)
    });

    let (negative, body) = match body.strip_prefix(['-', '\u{2212}']) {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let (integer_part, fraction) = split_fraction(body, profile.decimal_separator)?;
    let digits = ungroup(integer_part, &profile.thousands_variants())?;

    let normalized = match fraction {
        Some(fraction) => format!("{}.{}", digits, fraction),
        None => digits,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Split off the fraction, enforcing a single separator with 1-2 digits after it.
fn split_fraction(body: &str, decimal_separator: char) -> Option<(&str, Option<&str>)> {
    let mut parts = body.split(decimal_separator);
    let integer_part = parts.next()?;

    let Some(fraction) = parts.next() else {
        return Some((integer_part, None));
    };
    if parts.next().is_some() {
        return None;
    }

    let valid = (1..=2).contains(&fraction.len()) && fraction.bytes().all(|b| b.is_ascii_digit());
    valid.then_some((integer_part, Some(fraction)))
}

/// Remove thousands separators, rejecting groups that are not sized 3.
fn ungroup(integer_part: &str, separators: &[char]) -> Option<String> {
    if integer_part.is_empty() {
        return None;
    }

    if !integer_part.contains(separators) {
        return integer_part
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| integer_part.to_string());
    }

    let mut digits = String::with_capacity(integer_part.len());
    for (i, group) in integer_part.split(separators).enumerate() {
        let size_ok = if i == 0 {
            (1..=3).contains(&group.len())
        } else {
            group.len() == 3
        };
        if !size_ok || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Format an amount under a profile (e.g. `1'234'567.50`).
///
/// Values with more than two decimal places are rounded to two, since the
/// parser never reads longer fractions.
pub fn format_amount(amount: Decimal, profile: &LocaleNumericProfile) -> String {
    let amount = if amount.scale() > 2 {
        amount.round_dp(2)
    } else {
        amount
    };

    let s = amount.abs().to_string();
    let (integer_part, fraction) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if let Some(sep) = profile.thousands_separator {
            if i > 0 && (chars.len() - i) % 3 == 0 {
                formatted.push(sep);
            }
        }
        formatted.push(*c);
    }

    if let Some(fraction) = fraction {
        formatted.push(profile.decimal_separator);
        formatted.push_str(fraction);
    }

    formatted
}
