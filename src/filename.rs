//! Partition filename codec.
//!
//! Partition files are named `<prefix>.<yyyyMMddHHmmssSSS>.table` — a
//! 17-character compact UTC timestamp with millisecond precision between the
//! table prefix and the `.table` suffix. The timestamp is the partition's
//! creation time and the sole source of truth for its age. The encoding is
//! lexicographic-by-time, so a monotonic clock yields strictly increasing
//! names.
//!
//! Pre-split legacy files were named `<prefix>.XXXXXX` (six opaque characters
//! after the dot); the scanner upgrades those to the modern shape at open.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::{Error, Result};

/// Length of the compact timestamp field.
pub const TIMESTAMP_LEN: usize = 17;

/// Suffix of modern partition files.
pub const SUFFIX: &str = ".table";

/// Characters a modern partition filename adds to its prefix: dot, timestamp,
/// suffix.
pub const NAME_OVERHEAD: usize = 1 + TIMESTAMP_LEN + SUFFIX.len();

/// Characters a legacy filename adds to its prefix: dot plus six opaque ones.
pub const LEGACY_OVERHEAD: usize = 7;

/// Build a partition filename for the given creation time.
pub fn partition_filename(prefix: &str, created_ms: u64) -> String {
    format!("{prefix}.{}{SUFFIX}", format_timestamp(created_ms))
}

/// Whether `name` has the exact modern partition shape for `prefix`.
pub fn is_partition_name(prefix: &str, name: &str) -> bool {
    name.len() == prefix.len() + NAME_OVERHEAD
        && name.starts_with(prefix)
        && name.as_bytes()[prefix.len()] == b'.'
        && name.ends_with(SUFFIX)
        && name.as_bytes()[prefix.len() + 1..prefix.len() + 1 + TIMESTAMP_LEN]
            .iter()
            .all(|b| b.is_ascii_digit())
}

/// Whether `name` has the pre-split legacy shape for `prefix`.
pub fn is_legacy_name(prefix: &str, name: &str) -> bool {
    name.len() == prefix.len() + LEGACY_OVERHEAD
        && name.starts_with(prefix)
        && name.as_bytes()[prefix.len()] == b'.'
}

/// Recover the creation time (epoch milliseconds) from a partition filename.
pub fn parse_created_ms(prefix: &str, name: &str) -> Result<u64> {
    if !is_partition_name(prefix, name) {
        return Err(Error::MalformedName(name.to_string()));
    }
    let stamp = &name[prefix.len() + 1..prefix.len() + 1 + TIMESTAMP_LEN];
    parse_timestamp(stamp).ok_or_else(|| Error::MalformedName(name.to_string()))
}

/// Format epoch milliseconds as `yyyyMMddHHmmssSSS` (UTC).
pub fn format_timestamp(epoch_ms: u64) -> String {
    let dt = OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000)
        .expect("timestamp out of calendar range");
    let date = dt.date();
    let time = dt.time();
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}{:03}",
        date.year(),
        date.month() as u8,
        date.day(),
        time.hour(),
        time.minute(),
        time.second(),
        time.millisecond()
    )
}

/// Parse a `yyyyMMddHHmmssSSS` timestamp back to epoch milliseconds.
///
/// Returns `None` when a field is out of calendar range (month 13, hour 25,
/// a date before the epoch). Shape checks belong to the caller.
pub fn parse_timestamp(stamp: &str) -> Option<u64> {
    if stamp.len() != TIMESTAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |from: usize, to: usize| stamp[from..to].parse::<u32>().ok();

    let year = field(0, 4)? as i32;
    let month = Month::try_from(field(4, 6)? as u8).ok()?;
    let day = field(6, 8)? as u8;
    let hour = field(8, 10)? as u8;
    let minute = field(10, 12)? as u8;
    let second = field(12, 14)? as u8;
    let milli = field(14, 17)? as u16;

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms_milli(hour, minute, second, milli).ok()?;
    let ns = PrimitiveDateTime::new(date, time)
        .assume_utc()
        .unix_timestamp_nanos();
    if ns < 0 {
        return None;
    }
    Some((ns / 1_000_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-29 15:30:45.123 UTC
    const SAMPLE_MS: u64 = 1_706_542_245_123;

    #[test]
    fn format_is_compact_utc() {
        assert_eq!(format_timestamp(SAMPLE_MS), "20240129153045123");
        assert_eq!(format_timestamp(0), "19700101000000000");
    }

    #[test]
    fn timestamp_round_trip() {
        assert_eq!(parse_timestamp("20240129153045123"), Some(SAMPLE_MS));
        assert_eq!(parse_timestamp(&format_timestamp(0)), Some(0));
    }

    #[test]
    fn filename_round_trip() {
        let name = partition_filename("urls", SAMPLE_MS);
        assert_eq!(name, "urls.20240129153045123.table");
        assert_eq!(name.len(), "urls".len() + NAME_OVERHEAD);
        assert!(is_partition_name("urls", &name));
        assert_eq!(parse_created_ms("urls", &name).unwrap(), SAMPLE_MS);
    }

    #[test]
    fn names_increase_with_time() {
        let a = partition_filename("t", SAMPLE_MS);
        let b = partition_filename("t", SAMPLE_MS + 1);
        assert!(a < b);
    }

    #[test]
    fn rejects_malformed_names() {
        for name in [
            "urls.20240129153045123.tab",   // wrong suffix
            "urls.2024012915304512.table",  // short timestamp
            "urls.2024012915304512x.table", // non-digit
            "urlsx20240129153045123.table", // missing dot
            "other.20240129153045123.table",
        ] {
            assert!(!is_partition_name("urls", name), "{name}");
            assert!(parse_created_ms("urls", name).is_err(), "{name}");
        }
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert_eq!(parse_timestamp("20241329153045123"), None); // month 13
        assert_eq!(parse_timestamp("20240132153045123"), None); // day 32
        assert_eq!(parse_timestamp("20240129253045123"), None); // hour 25
        assert_eq!(parse_timestamp("19691231235959999"), None); // before epoch
    }

    #[test]
    fn legacy_shape() {
        assert!(is_legacy_name("urls", "urls.8GJsdf"));
        assert!(!is_legacy_name("urls", "urls.8GJsd"));
        assert!(!is_legacy_name("urls", "urls.8GJsdf0"));
        assert!(!is_legacy_name("urls", "other.8GJsdf"));
    }
}
