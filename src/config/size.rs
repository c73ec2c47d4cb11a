//! Size string parsing
//!
//! Converts human-readable sizes ("1G", "20Mi", "500MiB", "1073741824") into
//! byte counts. Unsuffixed and `B` values are bytes, `K`/`M`/`G`/... are
//! decimal multiples and `Ki`/`Mi`/`Gi`/... are binary multiples.

use crate::error::{Error, Result};

/// Parse a size string to a byte count
pub fn convert_size_to_bytes(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::SizeParse("empty size string".into()));
    }

    // Find where the number ends and unit begins
    let num_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let num_str = &s[..num_end];
    let unit_str = s[num_end..].trim();

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::SizeParse(format!("invalid number: {}", s)))?;

    let multiplier = unit_multiplier(unit_str)
        .ok_or_else(|| Error::SizeParse(format!("unknown unit: {}", unit_str)))?;

    let bytes = num * multiplier as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(Error::SizeParse(format!("size out of range: {}", s)));
    }

    Ok(bytes as u64)
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    const KI: u64 = 1024;
    const K: u64 = 1000;

    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => K,
        "M" | "MB" => K.pow(2),
        "G" | "GB" => K.pow(3),
        "T" | "TB" => K.pow(4),
        "P" | "PB" => K.pow(5),
        "E" | "EB" => K.pow(6),
        "KI" | "KIB" => KI,
        "MI" | "MIB" => KI.pow(2),
        "GI" | "GIB" => KI.pow(3),
        "TI" | "TIB" => KI.pow(4),
        "PI" | "PIB" => KI.pow(5),
        "EI" | "EIB" => KI.pow(6),
        _ => return None,
    };

    Some(multiplier)
}
