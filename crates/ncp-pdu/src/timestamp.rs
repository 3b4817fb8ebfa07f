//! Packet timestamp: unix seconds + nanoseconds, always UTC, microsecond
//! resolution on decode (spec §3 "Timestamp").

use chrono::{DateTime, TimeZone, Utc};
use ncp_core::{DecodeError, DecodeErrorExt};

/// Encodes `timestamp` to `(unix_seconds, nanoseconds)`. Nanoseconds are
/// derived from the timestamp's microsecond component (`* 1000`), per spec.
pub fn encode_timestamp(timestamp: DateTime<Utc>) -> (u32, u32) {
    let seconds = u32::try_from(timestamp.timestamp().max(0)).unwrap_or(u32::MAX);
    let microseconds = timestamp.timestamp_subsec_micros();
    (seconds, microseconds * 1000)
}

/// Decodes `(unix_seconds, nanoseconds)` to a UTC timestamp. Only
/// microsecond resolution is guaranteed on decode, per spec.
pub fn decode_timestamp(unix_seconds: u32, nanoseconds: u32) -> Result<DateTime<Utc>, DecodeError> {
    let microseconds = nanoseconds / 1000;
    Utc.timestamp_opt(i64::from(unix_seconds), microseconds * 1000)
        .single()
        .ok_or_else(|| DecodeError::invalid_field("decode_timestamp", "timestamp", "out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_to_microsecond_resolution() {
        let original = Utc.timestamp_opt(1_700_000_000, 123_456_000).single().unwrap();
        let (seconds, nanos) = encode_timestamp(original);
        let decoded = decode_timestamp(seconds, nanos).unwrap();
        assert_eq!(decoded, original);
    }
}
