//! Byte size parsing and formatting helpers

use crate::error::{AppError, Result};

/// Bits in one megabit as reported by this tool (binary, 1024 x 1024)
pub const MEGABIT: f64 = 1024.0 * 1024.0;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Parse a byte size such as `1048576`, `512K`, `10MiB` or `1G`.
///
/// Suffixes are binary regardless of spelling: `K`, `KB` and `KiB` all mean
/// 1024 bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::parse("Size cannot be empty"));
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(AppError::parse(format!("Invalid size '{}': missing number", input)));
    }

    let value: u64 = digits
        .parse()
        .map_err(|e| AppError::parse(format!("Invalid size '{}': {}", input, e)))?;

    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        other => {
            return Err(AppError::parse(format!(
                "Invalid size suffix '{}' in '{}'",
                other, input
            )))
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| AppError::parse(format!("Size '{}' is too large", input)))
}

/// Render a byte count with the largest whole binary unit
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GiB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KiB", bytes / KIB)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
