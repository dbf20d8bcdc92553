// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unit decoding for sizes and durations.
//!
//! bcachefs prints human-readable quantities with either SI prefixes
//! (`k`, `M`, `G`, ... optionally followed by `B`) or IEC prefixes (`KiB`,
//! `MiB`, ...). Durations use a small fixed table from nanoseconds to years.
//!
//! Fractional sizes are multiplied by the unit factor and then truncated
//! toward zero, so `24.9 KiB` decodes to 25497 bytes, not 25498.

use crate::error::{Error, Result};

/// SI prefixes without a byte suffix, index `i` means `1000^i`.
const DECIMAL_PREFIXES: [&str; 9] = ["", "k", "M", "G", "T", "P", "E", "Z", "Y"];
/// SI byte units, index `i` means `1000^i`.
const DECIMAL_BYTE_UNITS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
/// IEC byte units, index `i` means `1024^i`.
const BINARY_BYTE_UNITS: [&str; 9] = [
    "B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB",
];

/// Time units as `(name, seconds per unit, units per second)`.
///
/// Sub-second units divide instead of multiplying by an inexact fraction so
/// that `353 ms` decodes to exactly `0.353`.
const TIME_UNITS: [(&str, f64, f64); 10] = [
    ("ns", 1.0, 1e9),
    ("us", 1.0, 1e6),
    ("ms", 1.0, 1e3),
    ("s", 1.0, 1.0),
    ("m", 60.0, 1.0),
    ("h", 3_600.0, 1.0),
    ("d", 86_400.0, 1.0),
    ("w", 604_800.0, 1.0),
    ("y", 31_557_600.0, 1.0),
    // Printed by the kernel for out-of-range values. Never seen in practice.
    ("eon", f64::NAN, 1.0),
];

/// Multiplier for a size unit token. `None` when the unit is unknown.
pub fn size_unit_factor(unit: &str) -> Option<u128> {
    for i in 0..DECIMAL_PREFIXES.len() {
        let exp = i as u32;
        if unit == DECIMAL_BYTE_UNITS[i] || unit == DECIMAL_PREFIXES[i] {
            return Some(1000u128.pow(exp));
        }
        if unit == BINARY_BYTE_UNITS[i] {
            return Some(1024u128.pow(exp));
        }
    }
    None
}

/// True if `token` is a non-empty size unit such as `KiB`, `MB` or `k`.
pub fn is_size_unit(token: &str) -> bool {
    !token.is_empty() && size_unit_factor(token).is_some()
}

/// Decode a numeric literal and a unit into bytes.
///
/// The literal may be fractional; the product is truncated toward zero.
/// Results that do not fit in `u64` saturate.
///
/// ```
/// use bcachefs_exporter::parsing::units::decode_size;
///
/// assert_eq!(decode_size("7.69", "G").unwrap(), 7_690_000_000);
/// assert_eq!(decode_size("19.1", "GiB").unwrap(), 20_508_468_838);
/// ```
pub fn decode_size(literal: &str, unit: &str) -> Result<u64> {
    let factor = size_unit_factor(unit).ok_or_else(|| Error::UnitUnknown(unit.to_string()))?;

    if literal.is_empty() || !literal.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(Error::invalid_number(literal, "not a decimal literal"));
    }

    if !literal.contains('.') {
        let whole = literal
            .parse::<u128>()
            .map_err(|e| Error::invalid_number(literal, e))?;
        let bytes = whole.saturating_mul(factor);
        return Ok(u64::try_from(bytes).unwrap_or(u64::MAX));
    }

    let value = literal
        .parse::<f64>()
        .map_err(|e| Error::invalid_number(literal, e))?;
    // `as` truncates toward zero and saturates, which is the behavior we want.
    Ok((value * factor as f64) as u64)
}

/// Split a glued token like `24.9KiB` into `("24.9", "KiB")`.
///
/// The numeric part is the leading run of digits with at most one `.`.
pub fn split_numeric_and_unit(token: &str) -> (&str, &str) {
    let mut seen_dot = false;
    let mut idx = token.len();
    for (i, c) in token.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        if c == '.' && !seen_dot {
            seen_dot = true;
            continue;
        }
        idx = i;
        break;
    }
    token.split_at(idx)
}

/// Decode a single glued size token such as `24.9KiB`, `129k` or `306B`.
pub fn decode_size_token(token: &str) -> Result<u64> {
    let token = token.trim();
    let (literal, unit) = split_numeric_and_unit(token);
    if literal.is_empty() {
        return Err(Error::MalformedSizeToken(token.to_string()));
    }
    decode_size(literal, unit)
}

/// Decode a size given as one glued token or as a `literal unit` pair.
pub fn decode_size_fields(fields: &[&str]) -> Result<u64> {
    match fields {
        [token] => decode_size_token(token),
        [literal, unit] => decode_size(literal, unit),
        _ => Err(Error::MalformedSizeToken(fields.join(" "))),
    }
}

/// Decode a size that may be a plain integer, `1.32 TiB` or `1.32TiB`.
pub fn decode_size_value(text: &str) -> Result<u64> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    decode_size_fields(&fields)
}

/// Decode a run of whitespace-separated size tokens into values.
///
/// Each value is either a bare integer, a glued token (`2.86TiB`) or a
/// literal followed by a separate unit token (`2.86 TiB`). A token that
/// parses as a plain integer is taken as-is unless the next token is a unit.
pub fn decode_size_run(tokens: &[&str]) -> Result<Vec<u64>> {
    let mut values = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let next_is_unit = tokens.get(i + 1).is_some_and(|next| is_size_unit(next));
        if next_is_unit {
            values.push(decode_size(token, tokens[i + 1])?);
            i += 2;
        } else if let Ok(plain) = token.parse::<u64>() {
            values.push(plain);
            i += 1;
        } else {
            values.push(decode_size_token(token)?);
            i += 1;
        }
    }
    Ok(values)
}

fn time_unit(unit: &str) -> Option<(f64, f64)> {
    TIME_UNITS
        .iter()
        .find(|(name, _, _)| *name == unit)
        .map(|(_, mul, div)| (*mul, *div))
}

/// Decode an integer literal and a time unit into seconds.
///
/// ```
/// use bcachefs_exporter::parsing::units::decode_duration;
///
/// assert_eq!(decode_duration("353", "ms").unwrap(), 0.353);
/// assert_eq!(decode_duration("2", "m").unwrap(), 120.0);
/// ```
pub fn decode_duration(literal: &str, unit: &str) -> Result<f64> {
    let (mul, div) = time_unit(unit).ok_or_else(|| Error::UnitUnknown(unit.to_string()))?;
    let value = literal
        .parse::<i64>()
        .map_err(|e| Error::invalid_number(literal, e))?;
    Ok(value as f64 * mul / div)
}
