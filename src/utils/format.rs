use chrono::{DateTime, Utc};

/// Render a wave timestamp for display.
pub fn format_wave_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Shorten a hex address to `0x1234…abcd` for log lines. Short inputs are returned as-is.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_chain_seconds() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_wave_timestamp(&timestamp), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn shortens_long_addresses_only() {
        assert_eq!(
            short_address("0xBFbbA13D83A9C026F9226a5C071C5a20A2cA6Fd0"),
            "0xBFbb…6Fd0"
        );
        assert_eq!(short_address("0xABC"), "0xABC");
    }
}
