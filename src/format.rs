//! Fixed-point rendering of numeric command values.
//!
//! Values are rounded half away from zero, applied to the shortest decimal representation
//! that round-trips to the same `f64`. `1.2345` is therefore treated as the decimal it was
//! written as, not as its binary approximation `1.23449999...`, and renders as `1.235` at
//! three digits.

/// Precision used when none is configured.
pub const DEFAULT_PRECISION: usize = 3;

/// Render `value` with exactly `precision` fractional digits.
///
/// Returns `None` for NaN and infinities. A result that rounds to zero carries no sign.
pub fn format_fixed(value: f64, precision: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    // `Display` for f64 never switches to exponent notation.
    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(core::iter::repeat(b'0')).take(precision))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part
        .as_bytes()
        .get(precision)
        .is_some_and(|&next| next >= b'5');

    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let int_len = digits.len() - precision;
    let negative = value.is_sign_negative() && digits.iter().any(|&d| d != 0);

    let mut out = String::with_capacity(digits.len() + 2);
    if negative {
        out.push('-');
    }
    out.extend(digits[..int_len].iter().map(|&d| char::from(b'0' + d)));
    if precision > 0 {
        out.push('.');
        out.extend(digits[int_len..].iter().map(|&d| char::from(b'0' + d)));
    }
    Some(out)
}
