use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of 100ns ticks between 1601-01-01 and the UNIX epoch.
pub const FILETIME_UNIX_EPOCH_OFFSET: i64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Timestamp expressed as 100-nanosecond ticks elapsed since 1601-01-01 UTC
/// (the Windows FILETIME convention).
///
/// Serialized as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filetime(i64);

impl Filetime {
    pub fn now() -> Self {
        Utc::now().into()
    }

    pub fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub fn ticks(&self) -> i64 {
        self.0
    }

    /// Converts the timestamp into a UTC datetime, returns [`None`] if the value
    /// is outside the range representable by [`chrono`].
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let unix_ticks = self.0.checked_sub(FILETIME_UNIX_EPOCH_OFFSET)?;
        let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
        let nanos = unix_ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
        DateTime::from_timestamp(secs, nanos as u32)
    }
}

/// Dates outside the FILETIME range (roughly years -27627 to 30828) saturate to
/// the nearest bound.
impl From<DateTime<Utc>> for Filetime {
    fn from(value: DateTime<Utc>) -> Self {
        let sub_ticks = i64::from(value.timestamp_subsec_nanos()) / NANOS_PER_TICK;
        let ticks = value
            .timestamp()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(sub_ticks))
            .and_then(|t| t.checked_add(FILETIME_UNIX_EPOCH_OFFSET));

        match ticks {
            Some(ticks) => Self(ticks),
            None if value.timestamp() < 0 => Self(i64::MIN),
            None => Self(i64::MAX),
        }
    }
}

impl From<i64> for Filetime {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Filetime> for i64 {
    fn from(value: Filetime) -> Self {
        value.0
    }
}

impl std::fmt::Display for Filetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{} ticks", self.0),
        }
    }
}
