//! Conversion between client supplied dates and the calendar dates stored in the database.
//!
//! Browsers send dates as timestamps in the user's local timezone, e.g. local midnight.
//! Formatting such a timestamp with the server's local offset can move it onto a neighbouring
//! day, so every timestamp is first reduced to its UTC calendar components and anchored at
//! 12:00 UTC. The result is then formatted as `YYYY-MM-DD`.

use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::{format_description, time},
};

/// The format of dates in the database and in API payloads.
const STORAGE_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The time of day that stored dates are anchored to.
const UTC_ANCHOR: Time = time!(12:00);

/// Anchor `instant` at noon UTC on its UTC calendar day.
pub fn anchor_to_utc_noon(instant: OffsetDateTime) -> OffsetDateTime {
    let utc = instant.to_offset(UtcOffset::UTC);

    PrimitiveDateTime::new(utc.date(), UTC_ANCHOR).assume_utc()
}

/// Format `instant` as the `YYYY-MM-DD` string stored in the database.
///
/// The result depends only on the UTC calendar components of `instant`, never on the
/// timezone of the server process.
pub fn to_storage_date_string(instant: OffsetDateTime) -> String {
    format_storage_date(anchor_to_utc_noon(instant).date())
}

/// Parse a stored `YYYY-MM-DD` string back into the noon UTC instant it stands for.
///
/// # Errors
/// Returns an error if `text` is not a valid `YYYY-MM-DD` date.
pub fn from_storage_date_string(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let date = Date::parse(text, STORAGE_DATE_FORMAT)?;

    Ok(PrimitiveDateTime::new(date, UTC_ANCHOR).assume_utc())
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_storage_date(date: Date) -> String {
    date.format(STORAGE_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Parse a date sent by a client.
///
/// Accepts either a plain `YYYY-MM-DD` date or an RFC 3339 timestamp. Timestamps are normalized
/// to their UTC calendar day.
///
/// # Errors
/// Returns an error if `text` is neither format.
pub fn parse_client_date(text: &str) -> Result<Date, time::error::Parse> {
    let text = text.trim();

    let stored = match OffsetDateTime::parse(text, &Rfc3339) {
        Ok(instant) => to_storage_date_string(instant),
        Err(_) => text.to_owned(),
    };

    from_storage_date_string(&stored).map(|instant| instant.date())
}

/// Serde adapter that writes a [Date] as `YYYY-MM-DD` and reads any format accepted by
/// [parse_client_date].
pub mod as_storage_date {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::Date;

    use super::{format_storage_date, parse_client_date};

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_storage_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;

        parse_client_date(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use time::{
        OffsetDateTime,
        format_description::well_known::Rfc3339,
        macros::{date, datetime},
    };

    use super::{
        anchor_to_utc_noon, from_storage_date_string, parse_client_date, to_storage_date_string,
    };

    #[track_caller]
    fn parse_rfc3339(text: &str) -> OffsetDateTime {
        OffsetDateTime::parse(text, &Rfc3339).expect("valid RFC 3339 timestamp")
    }

    #[test]
    fn late_evening_west_of_utc_moves_to_next_utc_day() {
        let instant = parse_rfc3339("2024-02-29T23:00:00-05:00");

        assert_eq!(to_storage_date_string(instant), "2024-03-01");
    }

    #[test]
    fn early_morning_east_of_utc_moves_to_previous_utc_day() {
        let instant = parse_rfc3339("2024-03-01T00:30:00+13:00");

        assert_eq!(to_storage_date_string(instant), "2024-02-29");
    }

    #[test]
    fn utc_midnight_keeps_its_date() {
        assert_eq!(
            to_storage_date_string(datetime!(2025-01-15 00:00 UTC)),
            "2025-01-15"
        );
    }

    #[test]
    fn anchors_at_noon_utc() {
        let anchored = anchor_to_utc_noon(datetime!(2025-06-30 23:59:59 +02:00));

        assert_eq!(anchored, datetime!(2025-06-30 12:00 UTC));
    }

    #[test]
    fn inverse_parses_noon_utc() {
        let instant = from_storage_date_string("2024-02-29").unwrap();

        assert_eq!(instant, datetime!(2024-02-29 12:00 UTC));
        assert_eq!(to_storage_date_string(instant), "2024-02-29");
    }

    #[test]
    fn inverse_rejects_garbage() {
        assert!(from_storage_date_string("29/02/2024").is_err());
        assert!(from_storage_date_string("").is_err());
    }

    #[test]
    fn client_date_accepts_plain_dates_and_timestamps() {
        assert_eq!(parse_client_date("2024-02-29"), Ok(date!(2024 - 02 - 29)));
        assert_eq!(
            parse_client_date("2024-02-29T23:00:00-05:00"),
            Ok(date!(2024 - 03 - 01))
        );
        assert!(parse_client_date("yesterday").is_err());
    }
}
