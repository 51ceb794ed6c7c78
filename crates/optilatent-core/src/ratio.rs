//! Parsing of aspect-ratio and dimension strings.
//!
//! Accepted ratio forms are `W:H`, `WxH` (either case of `x`) and a bare
//! decimal such as `1.777`. Parsing is purely syntactic: no clamping or
//! rounding happens here.

use crate::error::{OptiError, Result};

/// Parse an aspect-ratio string into `width / height`.
///
/// `:` takes precedence over `x`; each is split once, so `"1:2:3"` is
/// rejected because `"2:3"` is not a number. A zero height is rejected.
pub fn parse_ratio(text: &str) -> Result<f64> {
    let s = text.trim();
    let lowered = s.to_ascii_lowercase();

    let parts = if s.contains(':') {
        s.split_once(':')
    } else if lowered.contains('x') {
        lowered.split_once('x')
    } else {
        let value = parse_number(s, text)?;
        return Ok(value);
    };

    let (left, right) =
        parts.ok_or_else(|| OptiError::InvalidFormat(format!("Invalid ratio format: '{text}'")))?;
    let w = parse_number(left, text)?;
    let h = parse_number(right, text)?;
    if h == 0.0 {
        return Err(OptiError::InvalidFormat(format!(
            "Height cannot be zero in ratio '{text}'"
        )));
    }

    let ratio = w / h;
    if !ratio.is_finite() {
        return Err(OptiError::InvalidFormat(format!(
            "Ratio '{text}' is not a finite number"
        )));
    }
    Ok(ratio)
}

/// Parse an exact `WxH` or `W:H` resolution into integer dimensions.
///
/// Unlike [`parse_ratio`], `x` is checked before `:` and a bare number is
/// rejected.
pub fn parse_exact_dimensions(text: &str) -> Result<(i64, i64)> {
    let s = text.trim().to_ascii_lowercase();

    let parts = if s.contains('x') {
        s.split_once('x')
    } else if s.contains(':') {
        s.split_once(':')
    } else {
        None
    };
    let (left, right) = parts.ok_or_else(|| {
        OptiError::InvalidFormat(format!(
            "Use WxH or W:H format for exact resolution, got '{text}'"
        ))
    })?;

    let w = parse_integer(left, text)?;
    let h = parse_integer(right, text)?;
    Ok((w, h))
}

fn parse_number(part: &str, original: &str) -> Result<f64> {
    let value: f64 = part
        .trim()
        .parse()
        .map_err(|_| OptiError::InvalidFormat(format!("Invalid ratio format: '{original}'")))?;
    if !value.is_finite() {
        return Err(OptiError::InvalidFormat(format!(
            "Ratio '{original}' is not a finite number"
        )));
    }
    Ok(value)
}

fn parse_integer(part: &str, original: &str) -> Result<i64> {
    part.trim().parse().map_err(|_| {
        OptiError::InvalidFormat(format!(
            "Invalid format '{original}'. Use WxH or W:H with integer parts"
        ))
    })
}
