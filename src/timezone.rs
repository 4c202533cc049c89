//! Display of stored UTC timestamps in the server's local timezone.

use time::{OffsetDateTime, UtcOffset, macros::format_description};
use time_tz::{Offset, TimeZone};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Like [get_local_offset], but an unknown timezone is an [Error::InvalidTimezoneError].
pub fn local_offset_or_error(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    get_local_offset(canonical_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {canonical_timezone}");
        Error::InvalidTimezoneError(canonical_timezone.to_owned())
    })
}

/// Format `timestamp` in the local timezone, e.g. "2025-03-04 09:15".
pub fn format_local_timestamp(timestamp: OffsetDateTime, local_offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");

    timestamp
        .to_offset(local_offset)
        .format(format)
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::datetime};

    use crate::{
        Error,
        timezone::{format_local_timestamp, get_local_offset, local_offset_or_error},
    };

    #[test]
    fn utc_has_zero_offset() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            local_offset_or_error("Mars/Olympus_Mons"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn formats_in_local_time() {
        let offset = UtcOffset::from_hms(13, 0, 0).unwrap();

        assert_eq!(
            format_local_timestamp(datetime!(2025-03-04 20:15 UTC), offset),
            "2025-03-05 09:15"
        );
    }
}
