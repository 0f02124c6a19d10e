//! Utility functions for meerkat

use chrono::{DateTime, Local};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Human-readable timestamp format written into the status table
pub const TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S %a";

/// Start-time format embedded in a ServerID (no dashes)
const START_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Percent-encoding set for sheet names in URL paths
const SHEET_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'!');

/// Encode a sheet name for URL usage
pub fn encode_sheet(sheet: &str) -> String {
    utf8_percent_encode(sheet, SHEET_ENCODE_SET).to_string()
}

/// Current local time in table format
pub fn current_time() -> String {
    format_time(Local::now())
}

pub fn format_time(t: DateTime<Local>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Build a ServerID: `<host>:<port>-<start time>`
pub fn make_server_id(host: &str, port: u16, started: DateTime<Local>) -> String {
    format!("{}:{}-{}", host, port, started.format(START_TIME_FORMAT))
}

/// Network address (`host:port`) encoded in a ServerID.
///
/// The start-time suffix never contains a dash, so the address is everything
/// before the last one. IDs without a suffix are returned unchanged.
pub fn peer_addr(server_id: &str) -> &str {
    match server_id.rsplit_once('-') {
        Some((addr, _)) => addr,
        None => server_id,
    }
}

/// Parse a string-encoded counter, treating garbage as zero
pub fn parse_count(s: &str) -> u32 {
    s.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_server_id_round_trip_address() {
        let started = Local.with_ymd_and_hms(2020, 11, 3, 9, 30, 0).unwrap();
        let id = make_server_id("spider-host-1", 4096, started);
        assert_eq!(id, "spider-host-1:4096-20201103093000");
        assert_eq!(peer_addr(&id), "spider-host-1:4096");
    }

    #[test]
    fn test_peer_addr_without_suffix() {
        assert_eq!(peer_addr("10.0.0.3:4096"), "10.0.0.3:4096");
    }

    #[test]
    fn test_format_time() {
        let t = Local.with_ymd_and_hms(2020, 11, 2, 15, 4, 5).unwrap();
        assert_eq!(format_time(t), "2020.11.02 15:04:05 Mon");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3"), 3);
        assert_eq!(parse_count(" 12 "), 12);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("x"), 0);
    }

    #[test]
    fn test_encode_sheet() {
        assert_eq!(encode_sheet("Status"), "Status");
        assert_eq!(encode_sheet("My Sheet/1"), "My%20Sheet%2F1");
    }
}
