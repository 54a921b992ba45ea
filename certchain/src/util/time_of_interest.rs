//! Utils to define the time of interest used for every validity check during verification

use core::{cmp::Ordering, fmt, time::Duration};

use der::DateTime;
use serde::{
    de::{self, Deserializer, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};

use crate::util::error::{Error, Result};

/// Time against which certificate and CRL dates are compared.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct TimeOfInterest(pub DateTime);

impl fmt::Display for TimeOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TimeOfInterest {
    /// Creates a [`TimeOfInterest`] for the current system time
    pub fn now() -> Result<Self> {
        DateTime::from_system_time(std::time::SystemTime::now())
            .map(Self)
            .map_err(Error::from)
    }

    /// Create a [`TimeOfInterest`] from Unix epoch
    pub fn from_unix_secs(v: u64) -> Result<Self> {
        Ok(Self(DateTime::from_unix_duration(Duration::from_secs(v))?))
    }

    /// Return Unix epoch (in seconds) for this value
    pub fn as_unix_secs(&self) -> u64 {
        self.0.unix_duration().as_secs()
    }

    /// True if `t` lies strictly before this time, i.e., a notAfter of `t` has passed.
    pub fn is_past(&self, t: &DateTime) -> bool {
        t.cmp(&self.0) == Ordering::Less
    }

    /// True if `t` lies strictly after this time, i.e., a notBefore of `t` has not been reached.
    pub fn is_future(&self, t: &DateTime) -> bool {
        t.cmp(&self.0) == Ordering::Greater
    }
}

impl PartialEq<DateTime> for TimeOfInterest {
    fn eq(&self, other: &DateTime) -> bool {
        self.0.eq(other)
    }
}

impl PartialOrd<DateTime> for TimeOfInterest {
    fn partial_cmp(&self, other: &DateTime) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

impl Serialize for TimeOfInterest {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.as_unix_secs())
    }
}

impl<'de> Deserialize<'de> for TimeOfInterest {
    fn deserialize<D>(deserializer: D) -> core::result::Result<TimeOfInterest, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ToiVisitor;

        impl<'de> Visitor<'de> for ToiVisitor {
            type Value = TimeOfInterest;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an integer between 0 and 2^64")
            }

            fn visit_u64<E>(self, value: u64) -> core::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                TimeOfInterest::from_unix_secs(value)
                    .map_err(|_| E::custom(format_args!("time of interest out of range: {value}")))
            }
        }

        deserializer.deserialize_u64(ToiVisitor)
    }
}

#[test]
fn toi_comparisons() {
    let toi = TimeOfInterest::from_unix_secs(1_700_000_000).unwrap();
    let earlier = DateTime::from_unix_duration(Duration::from_secs(1_600_000_000)).unwrap();
    let later = DateTime::from_unix_duration(Duration::from_secs(1_800_000_000)).unwrap();
    assert!(toi.is_past(&earlier));
    assert!(!toi.is_future(&earlier));
    assert!(toi.is_future(&later));
    assert!(!toi.is_past(&toi.0));
    assert!(!toi.is_future(&toi.0));
    assert_eq!(toi.as_unix_secs(), 1_700_000_000);
    assert!(TimeOfInterest::now().unwrap() > toi);
}

#[test]
fn toi_serde() {
    let toi: TimeOfInterest = serde_json::from_str("1700000000").unwrap();
    assert_eq!(toi.as_unix_secs(), 1_700_000_000);
    assert_eq!(serde_json::to_string(&toi).unwrap(), "1700000000");
}
