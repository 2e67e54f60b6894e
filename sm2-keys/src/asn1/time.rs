//! Conversions between `chrono` and the X.509 validity times.
//!
//! RFC 5280 rules: UTCTime through 2049, GeneralizedTime from 2050 on,
//! always in UTC with whole seconds. Times before 1970 are not supported.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use der::asn1::{GeneralizedTime, UtcTime};
use x509_cert::time::Time;

use crate::error::{Result, Sm2Error};

/// Drop sub-second precision, which DER validity cannot carry.
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_nanosecond(0).unwrap_or(time)
}

pub fn to_x509_time(time: &DateTime<Utc>) -> Result<Time> {
    let secs = u64::try_from(time.timestamp()).map_err(|_| {
        Sm2Error::InvalidParameter(format!("{time} is before 1970 and cannot be encoded"))
    })?;
    let dt = der::DateTime::from_unix_duration(Duration::from_secs(secs))
        .map_err(|e| Sm2Error::InvalidParameter(format!("{time} cannot be encoded: {e}")))?;
    if dt.year() <= UtcTime::MAX_YEAR {
        let utc = UtcTime::from_date_time(dt)
            .map_err(|e| Sm2Error::InvalidParameter(format!("{time}: {e}")))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(dt)))
    }
}

pub fn from_x509_time(time: Time) -> Result<DateTime<Utc>> {
    let secs = time.to_unix_duration().as_secs();
    i64::try_from(secs)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .ok_or_else(|| Sm2Error::MalformedEncoding(format!("time value {secs} out of range")))
}
