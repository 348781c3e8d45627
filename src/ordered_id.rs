//! Ordered Identifiers
//!
//! Time-ordered UUIDv7 identifiers (RFC 9562) with an additional guarantee: every value
//! returned by a generation stream is strictly greater than every value that stream
//! returned before, even when both are produced within the same millisecond.
//!
//! The first 48 bits hold the Unix timestamp in milliseconds, so comparing identifiers
//! (or their readable strings) orders them chronologically.

use crate::error::ContextError;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{const_mutex, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::{Uuid, Variant};

/// UUID version used for ordered identifiers
pub const ORDERED_ID_VERSION: usize = 7;

/// Number of leading bytes holding the millisecond timestamp
const TIMESTAMP_BYTES: usize = 6;

/// A validated, time-ordered identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct OrderedId(Uuid);

impl OrderedId {
    /// Parse the hyphenated or simple UUID text form
    pub fn parse_str(input: &str) -> Result<Self, ContextError> {
        let uuid = Uuid::parse_str(input)
            .map_err(|e| ContextError::IdFormat(format!("'{}' is not a UUID: {}", input, e)))?;
        Self::try_from(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Milliseconds since the Unix epoch embedded in the identifier
    pub fn timestamp_millis(&self) -> u64 {
        embedded_millis(&self.0)
    }

    pub fn datetime(&self) -> Result<DateTime<Utc>, ContextError> {
        datetime_of(&self.0)
    }

    pub fn to_readable_string(&self) -> String {
        readable(&self.0)
    }
}

impl TryFrom<Uuid> for OrderedId {
    type Error = ContextError;

    fn try_from(value: Uuid) -> Result<Self, Self::Error> {
        validate(&value)?;
        Ok(OrderedId(value))
    }
}

impl From<OrderedId> for Uuid {
    fn from(value: OrderedId) -> Self {
        value.0
    }
}

impl fmt::Display for OrderedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single generation stream.
///
/// The last returned value is kept behind a mutex, so a stream shared between threads
/// serializes its callers and stays strictly increasing across all of them. Independent
/// streams only guarantee ordering against values produced in earlier milliseconds.
pub struct OrderedIdGenerator {
    last: Mutex<Uuid>,
}

impl OrderedIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: const_mutex(Uuid::nil()),
        }
    }

    /// Return an identifier greater than every identifier this stream returned before
    pub fn create_one(&self) -> OrderedId {
        let mut last = self.last.lock();
        let next = next_after(&last);
        *last = next;
        OrderedId(next)
    }

    /// Return `count` identifiers in strictly increasing order
    pub fn create_many(&self, count: usize) -> Vec<OrderedId> {
        let mut last = self.last.lock();
        let mut result = Vec::with_capacity(count);
        for _ in 0..count {
            let next = next_after(&last);
            *last = next;
            result.push(OrderedId(next));
        }
        result
    }
}

impl Default for OrderedIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_STREAM: OrderedIdGenerator = OrderedIdGenerator::new();

/// Create one identifier from the process-wide stream
pub fn create_one() -> OrderedId {
    PROCESS_STREAM.create_one()
}

/// Create `count` increasing identifiers from the process-wide stream
pub fn create_many(count: usize) -> Vec<OrderedId> {
    PROCESS_STREAM.create_many(count)
}

// Fresh draws carry fresh randomness, so a draw may land below the previous value
// within the same millisecond. Redraw until it does not; the wait is bounded by one tick.
fn next_after(last: &Uuid) -> Uuid {
    loop {
        let candidate = Uuid::now_v7();
        if candidate > *last {
            return candidate;
        }
        std::hint::spin_loop();
    }
}

/// Check that `value` is an RFC 4122 UUID of the ordered version
pub fn validate(value: &Uuid) -> Result<(), ContextError> {
    if value.get_variant() != Variant::RFC4122 {
        return Err(ContextError::IdFormat(format!(
            "UUID {} has variant {:?} while RFC 4122 is expected",
            value,
            value.get_variant()
        )));
    }
    let version = value.get_version_num();
    if version != ORDERED_ID_VERSION {
        return Err(ContextError::IdVersion {
            expected: ORDERED_ID_VERSION,
            actual: version,
        });
    }
    Ok(())
}

/// Extract the embedded timestamp as a UTC instant
pub fn datetime_of(value: &Uuid) -> Result<DateTime<Utc>, ContextError> {
    validate(value)?;
    let millis = embedded_millis(value);
    let millis = i64::try_from(millis)
        .map_err(|_| ContextError::IdFormat(format!("UUID {} timestamp is out of range", value)))?;
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        ContextError::IdFormat(format!("UUID {} timestamp is out of range", value))
    })
}

/// Render `2024-05-01T10:20:30.123Z-<remaining 20 hex digits>` for audit display
pub fn to_readable_string(value: &Uuid) -> Result<String, ContextError> {
    validate(value)?;
    Ok(readable(value))
}

fn readable(value: &Uuid) -> String {
    let millis = embedded_millis(value) as i64;
    let iso = match Utc.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => format!("{:012x}", millis),
    };
    format!("{}-{}", iso, hex::encode(&value.as_bytes()[TIMESTAMP_BYTES..]))
}

fn embedded_millis(value: &Uuid) -> u64 {
    value.as_bytes()[..TIMESTAMP_BYTES]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
