//! Error types for the sensor ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// The first group are the protocol rejections a caller can trigger; they are
/// always raised before any state is touched. The second group are
/// infrastructure failures of the hosting process.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the authority
    #[error("Only admin can call this")]
    Unauthorized,

    /// Sensor identity already has a record (active or revoked)
    #[error("Sensor already registered")]
    AlreadyRegistered,

    /// Revocation of an identity that was never registered
    #[error("Sensor not registered")]
    NotRegistered,

    /// Submission from an identity without a record
    #[error("Not a registered sensor")]
    NotRegisteredSensor,

    /// Submission from a revoked sensor
    #[error("Sensor is not active")]
    SensorInactive,

    /// PM2.5 above the configured bound
    #[error("PM2.5 value too high: {value} > {max}")]
    Pm25TooHigh {
        /// Submitted value
        value: u32,
        /// Upper bound
        max: u32,
    },

    /// PM10 above the configured bound
    #[error("PM10 value too high: {value} > {max}")]
    Pm10TooHigh {
        /// Submitted value
        value: u32,
        /// Upper bound
        max: u32,
    },

    /// Optional bound on NO2, SO2 or CO exceeded
    #[error("{pollutant} value too high: {value} > {max}")]
    ValueTooHigh {
        /// Pollutant name
        pollutant: &'static str,
        /// Submitted value
        value: u32,
        /// Upper bound
        max: u32,
    },

    /// Replayed or reordered submission
    #[error("Nonce must be greater than last accepted nonce: last {last}, got {got}")]
    NonceNotIncreasing {
        /// Current watermark
        last: u64,
        /// Submitted nonce
        got: u64,
    },

    /// Reading index past the end of the ledger
    #[error("Index out of bounds: {index} >= {count}")]
    IndexOutOfRange {
        /// Requested index
        index: u64,
        /// Ledger length
        count: u64,
    },

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short label used for the rejection metric
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::AlreadyRegistered => "already_registered",
            Error::NotRegistered => "not_registered",
            Error::NotRegisteredSensor => "not_registered_sensor",
            Error::SensorInactive => "sensor_inactive",
            Error::Pm25TooHigh { .. } => "pm25_too_high",
            Error::Pm10TooHigh { .. } => "pm10_too_high",
            Error::ValueTooHigh { .. } => "value_too_high",
            Error::NonceNotIncreasing { .. } => "nonce_not_increasing",
            Error::IndexOutOfRange { .. } => "index_out_of_range",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }

    /// True for rejections caused by the caller's input rather than the host
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Error::Storage(_)
                | Error::Serialization(_)
                | Error::Concurrency(_)
                | Error::Config(_)
                | Error::Io(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_messages() {
        assert_eq!(Error::Unauthorized.to_string(), "Only admin can call this");
        assert_eq!(Error::SensorInactive.to_string(), "Sensor is not active");
        assert!(Error::Pm25TooHigh { value: 600, max: 500 }
            .to_string()
            .starts_with("PM2.5 value too high"));
        assert!(Error::NonceNotIncreasing { last: 1, got: 1 }
            .to_string()
            .starts_with("Nonce must be greater than last accepted nonce"));
    }

    #[test]
    fn test_rejection_classification() {
        assert!(Error::AlreadyRegistered.is_rejection());
        assert!(!Error::Storage("disk full".to_string()).is_rejection());
        assert_eq!(Error::SensorInactive.reason(), "sensor_inactive");
    }
}
