//! Duration literal parsing for `ClaimOptions::expires` (spec §4.1):
//! `^(\d+)([smhd])$` with multipliers 1000/60_000/3_600_000/86_400_000 ms.
//! Anything else is rejected rather than silently defaulted.

use devport_protocol::DevportError;

pub fn parse_duration_ms(literal: &str) -> Result<i64, DevportError> {
    let invalid = || DevportError::InvalidDuration(literal.to_string());

    if literal.len() < 2 {
        return Err(invalid());
    }
    let (num_part, unit_part) = literal.split_at(literal.len() - 1);
    if num_part.is_empty() || !num_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let multiplier: i64 = match unit_part {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return Err(invalid()),
    };

    let count: i64 = num_part.parse().map_err(|_| invalid())?;
    Ok(count * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration_ms("1s").unwrap(), 1_000);
        assert_eq!(parse_duration_ms("5m").unwrap(), 300_000);
        assert_eq!(parse_duration_ms("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration_ms("2d").unwrap(), 172_800_000);
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration_ms("1w").is_err());
    }

    #[test]
    fn rejects_missing_number() {
        assert!(parse_duration_ms("h").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration_ms("forever").is_err());
        assert!(parse_duration_ms("").is_err());
        assert!(parse_duration_ms("1.5h").is_err());
    }
}
