//! Amount parsing - Turns what a user typed into a concrete number of coins.
//!
//! Accepted forms, all relative to a caller-supplied `total` (the balance being drawn from):
//! - a literal integer, optionally with thousands separators (`1,500`) or in `NeM` form (`2e3`);
//! - a percentage of the total (`30%`);
//! - `half`;
//! - `all` or `max`.
//!
//! Fractional results round half to even. The result is always positive, no greater than
//! `total` and no greater than [`MAX_TRANSFER`].

use crate::errors::{Error, Result};

/// Largest amount a single operation may move.
pub const MAX_TRANSFER: i64 = 100_000_000_000;

const OVERFLOW: &str = "Woah, the number you provided was so large I couldn't even read it.";

/// Resolves `input` against `total`.
pub fn parse_amount(input: &str, total: i64) -> Result<i64> {
    let text = input.trim().replace(',', "").to_lowercase();

    let amount = if let Some(percent) = text.strip_suffix('%') {
        percentage_of(percent, total)?
    } else {
        match text.as_str() {
            "half" => round_half_even(total, 2),
            "all" | "max" => total,
            _ => literal(&text)?,
        }
    };

    if amount <= 0 {
        return Err(Error::invalid_amount("The amount you provided resulted in 0."));
    }
    if amount > total {
        return Err(Error::invalid_amount("That's more money than you have."));
    }
    if amount > MAX_TRANSFER {
        return Err(Error::invalid_amount(
            "Transfers of money over one hundred billion are prohibited.",
        ));
    }
    Ok(amount)
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn literal(text: &str) -> Result<i64> {
    if let Some((mantissa, exponent)) = text.split_once('e') {
        if !is_digits(mantissa) || !is_digits(exponent) {
            return Err(Error::invalid_amount("Invalid amount provided."));
        }
        let mantissa: i64 = mantissa.parse().map_err(|_| Error::invalid_amount(OVERFLOW))?;
        let exponent: u32 = exponent.parse().map_err(|_| Error::invalid_amount(OVERFLOW))?;
        return 10_i64
            .checked_pow(exponent)
            .and_then(|scale| mantissa.checked_mul(scale))
            .ok_or_else(|| Error::invalid_amount(OVERFLOW));
    }

    if !is_digits(text) {
        return Err(Error::invalid_amount("Invalid amount provided."));
    }
    text.parse().map_err(|_| Error::invalid_amount(OVERFLOW))
}

fn percentage_of(percent: &str, total: i64) -> Result<i64> {
    if !is_digits(percent) {
        return Err(Error::invalid_amount("That's... not a valid percentage."));
    }
    let percent: i64 = percent
        .parse()
        .map_err(|_| Error::invalid_amount("You can't do more than 100%."))?;
    if percent > 100 {
        return Err(Error::invalid_amount("You can't do more than 100%."));
    }

    let scaled = i128::from(total) * i128::from(percent);
    Ok(round_half_even_wide(scaled, 100))
}

fn round_half_even(value: i64, divisor: i64) -> i64 {
    round_half_even_wide(i128::from(value), i128::from(divisor))
}

/// `value / divisor` rounded half to even, for non-negative `value` and positive `divisor`.
fn round_half_even_wide(value: i128, divisor: i128) -> i64 {
    let quotient = value / divisor;
    let remainder = value % divisor;
    let rounded = match (remainder * 2).cmp(&divisor) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient & 1),
    };
    // `value <= i64::MAX * 100` and `divisor >= 2` keep the result in range.
    i64::try_from(rounded).unwrap_or(i64::MAX)
}
