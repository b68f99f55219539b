use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Platform epoch (2015-01-01T00:00:00Z) in unix milliseconds.
pub const EPOCH_MS: u64 = 1_420_070_400_000;

/// Largest millisecond offset from [`EPOCH_MS`] that fits in an id's 42
/// timestamp bits (reached in 2154).
pub const MAX_OFFSET_MS: u64 = (1 << 42) - 1;

/// 64-bit platform identifier. The high 42 bits hold milliseconds since
/// [`EPOCH_MS`], so ids sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the unix epoch encoded in this id.
    pub const fn timestamp_ms(self) -> u64 {
        (self.0 >> 22) + EPOCH_MS
    }

    pub fn created_at(self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_ms() as i64)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Smallest id that could have been minted at `at`. Instants before the
    /// platform epoch clamp to zero, instants past the last representable
    /// millisecond clamp to it.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        let ms = at.timestamp_millis().max(0) as u64;
        Self(ms.saturating_sub(EPOCH_MS).min(MAX_OFFSET_MS) << 22)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// Ids travel as decimal strings on the wire since they overflow JS numbers.
impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a decimal string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
        Ok(Snowflake(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
        u64::try_from(v)
            .map(Snowflake)
            .map_err(|_| E::custom("snowflake cannot be negative"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
        v.parse().map(Snowflake).map_err(E::custom)
    }
}
