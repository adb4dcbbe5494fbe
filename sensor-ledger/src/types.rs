//! Core types for the sensor ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Cheap snapshots (plain owned data, `Clone`)
//! - No interior mutability: a `Reading` never changes after acceptance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque principal identifier (authority, sensor or any consumer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes, used as storage key
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Empty addresses are never valid principals
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Registration record of a sensor
///
/// `Default` is the zero-valued record returned for unknown identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Free-form location label
    pub location: String,

    /// False once revoked
    pub is_active: bool,

    /// Highest accepted nonce (0 before the first reading)
    pub last_nonce: u64,
}

impl SensorRecord {
    /// Fresh record for a newly registered sensor
    pub fn active(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            is_active: true,
            last_nonce: 0,
        }
    }
}

/// Values a sensor submits; the sensor identity is the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSubmission {
    /// PM2.5 concentration
    pub pm25: u32,
    /// PM10 concentration
    pub pm10: u32,
    /// NO2 concentration
    pub no2: u32,
    /// SO2 concentration
    pub so2: u32,
    /// CO concentration
    pub co: u32,
    /// AQI category label ("Good", "Moderate", ...)
    pub aqi_category: String,
    /// Per-sensor sequence number
    pub nonce: u64,
}

impl ReadingSubmission {
    /// Build a submission from the positional argument list
    pub fn new(
        pm25: u32,
        pm10: u32,
        no2: u32,
        so2: u32,
        co: u32,
        aqi_category: impl Into<String>,
        nonce: u64,
    ) -> Self {
        Self {
            pm25,
            pm10,
            no2,
            so2,
            co,
            aqi_category: aqi_category.into(),
            nonce,
        }
    }
}

/// Accepted reading, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Submitting sensor
    pub sensor: Address,

    /// Sensor location at acceptance time
    pub location: String,

    /// PM2.5 concentration
    pub pm25: u32,

    /// PM10 concentration
    pub pm10: u32,

    /// NO2 concentration
    pub no2: u32,

    /// SO2 concentration
    pub so2: u32,

    /// CO concentration
    pub co: u32,

    /// AQI category label
    pub aqi_category: String,

    /// Nonce the sensor used
    pub nonce: u64,

    /// Acceptance time, assigned by the ledger clock
    pub timestamp: DateTime<Utc>,
}

/// Notification emitted once per successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A sensor was admitted
    SensorRegistered {
        /// Sensor identity
        sensor: Address,
        /// Location label
        location: String,
    },

    /// A sensor was revoked
    SensorRevoked {
        /// Sensor identity
        sensor: Address,
    },

    /// A reading was appended at `index`
    ReadingSubmitted {
        /// Ledger index of the reading
        index: u64,
        /// The reading itself
        reading: Reading,
    },
}

impl LedgerEvent {
    /// Sensor the event is about
    pub fn sensor(&self) -> &Address {
        match self {
            LedgerEvent::SensorRegistered { sensor, .. } => sensor,
            LedgerEvent::SensorRevoked { sensor } => sensor,
            LedgerEvent::ReadingSubmitted { reading, .. } => &reading.sensor,
        }
    }

    /// Event name
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::SensorRegistered { .. } => "SensorRegistered",
            LedgerEvent::SensorRevoked { .. } => "SensorRevoked",
            LedgerEvent::ReadingSubmitted { .. } => "ReadingSubmitted",
        }
    }
}
