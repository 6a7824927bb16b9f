//! Time formatting and parsing helpers
//!
//! Business dates are exchanged in China Standard Time (UTC+8) using the
//! layouts below.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt::Display;

use crate::error::{Error, Result};

/// `yyyyMMddHHmmss`
pub const DATETIME14_LAYOUT: &str = "%Y%m%d%H%M%S";
/// `yyyyMMdd`
pub const DATETIME8_LAYOUT: &str = "%Y%m%d";
/// `yyyyMM`
pub const DATETIME6_LAYOUT: &str = "%Y%m";
/// `yyyy-MM-dd HH:mm:ss`
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
/// `yyyy-MM-dd HH:mm`
pub const DATETIME_MINUTE_LAYOUT: &str = "%Y-%m-%d %H:%M";
/// `yyyy-MM-dd`
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

const CST_OFFSET_SECS: i32 = 8 * 3600;

/// China Standard Time
pub fn cst() -> FixedOffset {
    FixedOffset::east_opt(CST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current time in China Standard Time
pub fn now_cst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&cst())
}

/// `yyyy-MM-dd HH:mm:ss` in the time's own zone
pub fn fmt_datetime<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATETIME_LAYOUT).to_string()
}

/// `yyyy-MM-dd HH:mm`
pub fn fmt_datetime_minute<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATETIME_MINUTE_LAYOUT).to_string()
}

/// `yyyy-MM-dd`
pub fn fmt_date<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATE_LAYOUT).to_string()
}

/// `yyyyMMddHHmmss`
pub fn fmt_datetime14<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATETIME14_LAYOUT).to_string()
}

/// `yyyyMMdd`
pub fn fmt_datetime8<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATETIME8_LAYOUT).to_string()
}

/// `yyyyMM`
pub fn fmt_datetime6<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format(DATETIME6_LAYOUT).to_string()
}

/// The time converted to China Standard Time, with its offset
pub fn fmt_cst_datetime<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    t.with_timezone(&cst())
        .format("%Y-%m-%d %H:%M:%S %z")
        .to_string()
}

/// Parse a form date plus a time of day, in China Standard Time
///
/// Only the first ten characters of `date` (`yyyy-MM-dd`) are used, so both
/// `2024-05-01` and `2024-05-01 08:00:00` are accepted; `hms` is `HH:mm:ss`.
pub fn parse_form_time(date: &str, hms: &str) -> Result<DateTime<FixedOffset>> {
    let day = date
        .get(..10)
        .ok_or_else(|| Error::ValidationError("date must be formatted as yyyy-MM-dd".into()))?;

    let naive = NaiveDateTime::parse_from_str(&format!("{} {}", day, hms), DATETIME_LAYOUT)
        .map_err(|e| Error::ValidationError(format!("invalid time '{} {}': {}", day, hms, e)))?;

    cst()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::ValidationError(format!("ambiguous time '{} {}'", day, hms)))
}

/// Serde adapter for nullable `yyyy-MM-dd HH:mm:ss` columns
///
/// ```rust
/// use chrono::NaiveDateTime;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Device {
///     #[serde(with = "webcommon::timeutil::null_datetime")]
///     last_seen: Option<NaiveDateTime>,
/// }
///
/// let d: Device = serde_json::from_str(r#"{"last_seen": null}"#).unwrap();
/// assert!(d.last_seen.is_none());
/// ```
pub mod null_datetime {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::DATETIME_LAYOUT;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.collect_str(&t.format(DATETIME_LAYOUT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.is_empty() => NaiveDateTime::parse_from_str(&s, DATETIME_LAYOUT)
                .map(Some)
                .map_err(de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    fn sample() -> DateTime<FixedOffset> {
        cst().with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap()
    }

    #[test]
    fn test_formatters() {
        let t = sample();
        assert_eq!(fmt_datetime(&t), "2024-03-09 07:05:03");
        assert_eq!(fmt_datetime_minute(&t), "2024-03-09 07:05");
        assert_eq!(fmt_date(&t), "2024-03-09");
        assert_eq!(fmt_datetime14(&t), "20240309070503");
        assert_eq!(fmt_datetime8(&t), "20240309");
        assert_eq!(fmt_datetime6(&t), "202403");
    }

    #[test]
    fn test_fmt_cst_from_utc() {
        let t = Utc.with_ymd_and_hms(2024, 3, 8, 23, 5, 3).unwrap();
        assert_eq!(fmt_cst_datetime(&t), "2024-03-09 07:05:03 +0800");
    }

    #[test]
    fn test_parse_form_time() {
        let t = parse_form_time("2024-03-09", "07:05:03").unwrap();
        assert_eq!(t, sample());

        let end = parse_form_time("2024-03-09 12:00:00", "23:59:59").unwrap();
        assert_eq!(fmt_datetime(&end), "2024-03-09 23:59:59");
        assert_eq!(end.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_parse_form_time_rejects_short_or_bad_input() {
        assert!(matches!(
            parse_form_time("2024-3-9", "00:00:00"),
            Err(Error::ValidationError(_))
        ));
        assert!(matches!(
            parse_form_time("2024-13-40", "00:00:00"),
            Err(Error::ValidationError(_))
        ));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        #[serde(with = "null_datetime")]
        at: Option<NaiveDateTime>,
    }

    #[test]
    fn test_null_datetime() {
        let some = Row {
            at: Some(sample().naive_local()),
        };
        let json = serde_json::to_string(&some).unwrap();
        assert_eq!(json, r#"{"at":"2024-03-09 07:05:03"}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), some);

        let none = Row { at: None };
        assert_eq!(serde_json::to_string(&none).unwrap(), r#"{"at":null}"#);
        assert_eq!(serde_json::from_str::<Row>(r#"{"at":""}"#).unwrap(), none);
    }
}
