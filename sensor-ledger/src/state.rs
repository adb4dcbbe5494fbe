//! Combined registry + ledger state machine
//!
//! Every mutating call is split in two phases:
//!
//! 1. `plan_*` runs all gates against the current state and returns the exact
//!    [`Mutation`] to perform, without touching anything.
//! 2. [`LedgerState::apply`] performs the mutation and returns the
//!    notification to emit. It cannot fail.
//!
//! The actor persists the mutation between the two phases, so a rejected call
//! or a failed store write leaves both memory and disk untouched, and a
//! reading is never visible without its watermark update.

use crate::{
    access::Authority,
    clock::Clock,
    readings::ReadingLedger,
    registry::SensorRegistry,
    types::{Address, LedgerEvent, Reading, ReadingSubmission, SensorRecord},
    validation::ValidationPolicy,
    Error, Result,
};

/// A validated state delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create a sensor record
    Register {
        /// Sensor identity
        sensor: Address,
        /// Registration sequence number
        seq: u64,
        /// New record
        record: SensorRecord,
    },

    /// Clear `is_active`
    Revoke {
        /// Sensor identity
        sensor: Address,
        /// Registration sequence number
        seq: u64,
        /// Record after revocation
        record: SensorRecord,
    },

    /// Advance the watermark and append a reading
    Submit {
        /// Registration sequence number of the sensor
        seq: u64,
        /// Record with the advanced watermark
        record: SensorRecord,
        /// Ledger index of the reading
        index: u64,
        /// Reading to append
        reading: Reading,
    },
}

impl Mutation {
    /// Sensor the mutation touches
    pub fn sensor(&self) -> &Address {
        match self {
            Mutation::Register { sensor, .. } | Mutation::Revoke { sensor, .. } => sensor,
            Mutation::Submit { reading, .. } => &reading.sensor,
        }
    }
}

/// Sensor registry and reading ledger, guarded as one resource
#[derive(Debug, Clone)]
pub struct LedgerState {
    registry: SensorRegistry,
    readings: ReadingLedger,
    policy: ValidationPolicy,
}

impl LedgerState {
    /// Empty state
    pub fn new(authority: Authority, policy: ValidationPolicy) -> Self {
        Self {
            registry: SensorRegistry::new(authority),
            readings: ReadingLedger::new(),
            policy,
        }
    }

    /// Rebuild state from persisted sensors (registration order) and readings
    /// (ledger order)
    pub fn restore(
        authority: Authority,
        policy: ValidationPolicy,
        sensors: Vec<(Address, SensorRecord)>,
        readings: Vec<Reading>,
    ) -> Self {
        let mut state = Self::new(authority, policy);
        for (sensor, record) in sensors {
            state.registry.insert(sensor, record);
        }
        for reading in readings {
            state.readings.append(reading);
        }
        state
    }

    // Planning (gates only)

    /// Gate a registration
    pub fn plan_register(
        &self,
        caller: &Address,
        sensor: Address,
        location: String,
    ) -> Result<Mutation> {
        self.registry.check_register(caller, &sensor)?;

        Ok(Mutation::Register {
            seq: self.registry.get_sensor_count(),
            record: SensorRecord::active(location),
            sensor,
        })
    }

    /// Gate a revocation
    pub fn plan_revoke(&self, caller: &Address, sensor: Address) -> Result<Mutation> {
        let record = self.registry.check_revoke(caller, &sensor)?;
        let seq = self.registry.position(&sensor).ok_or(Error::NotRegistered)?;

        Ok(Mutation::Revoke {
            sensor,
            seq,
            record,
        })
    }

    /// Gate a submission from `caller`; the clock is only read once every
    /// gate has passed
    pub fn plan_submit(
        &self,
        caller: &Address,
        submission: ReadingSubmission,
        clock: &dyn Clock,
    ) -> Result<Mutation> {
        // 1. Registration gate
        let current = self.registry.get(caller).ok_or(Error::NotRegisteredSensor)?;

        // 2. Active gate
        if !current.is_active {
            return Err(Error::SensorInactive);
        }

        // 3. Range gate
        self.policy.check_range(&submission)?;

        // 4. Anti-replay gate
        self.policy.check_nonce(current.last_nonce, submission.nonce)?;

        let seq = self.registry.position(caller).ok_or(Error::NotRegisteredSensor)?;
        let record = SensorRecord {
            last_nonce: submission.nonce,
            ..current.clone()
        };
        let reading = Reading {
            sensor: caller.clone(),
            location: current.location.clone(),
            pm25: submission.pm25,
            pm10: submission.pm10,
            no2: submission.no2,
            so2: submission.so2,
            co: submission.co,
            aqi_category: submission.aqi_category,
            nonce: submission.nonce,
            timestamp: clock.now(),
        };

        Ok(Mutation::Submit {
            seq,
            record,
            index: self.readings.next_index(),
            reading,
        })
    }

    // Commit

    /// Apply a planned mutation and return its notification
    ///
    /// Must be called with a mutation planned against this exact state, with
    /// no other mutation applied in between.
    pub fn apply(&mut self, mutation: Mutation) -> LedgerEvent {
        match mutation {
            Mutation::Register { sensor, record, .. } => {
                let location = record.location.clone();
                self.registry.insert(sensor.clone(), record);
                LedgerEvent::SensorRegistered { sensor, location }
            }
            Mutation::Revoke { sensor, record, .. } => {
                self.registry.replace(&sensor, record);
                LedgerEvent::SensorRevoked { sensor }
            }
            Mutation::Submit { record, reading, .. } => {
                self.registry.replace(&reading.sensor, record);
                let index = self.readings.append(reading.clone());
                LedgerEvent::ReadingSubmitted { index, reading }
            }
        }
    }

    // One-shot mutations for purely in-memory use

    /// Register a sensor
    pub fn register_sensor(
        &mut self,
        caller: &Address,
        sensor: Address,
        location: impl Into<String>,
    ) -> Result<LedgerEvent> {
        let mutation = self.plan_register(caller, sensor, location.into())?;
        Ok(self.apply(mutation))
    }

    /// Revoke a sensor
    pub fn revoke_sensor(&mut self, caller: &Address, sensor: Address) -> Result<LedgerEvent> {
        let mutation = self.plan_revoke(caller, sensor)?;
        Ok(self.apply(mutation))
    }

    /// Submit a reading as `caller`
    pub fn submit_reading(
        &mut self,
        caller: &Address,
        submission: ReadingSubmission,
        clock: &dyn Clock,
    ) -> Result<LedgerEvent> {
        let mutation = self.plan_submit(caller, submission, clock)?;
        Ok(self.apply(mutation))
    }

    // Queries

    /// Authority identity
    pub fn authority(&self) -> &Address {
        self.registry.authority()
    }

    /// True if the identity has a record
    pub fn is_registered_sensor(&self, sensor: &Address) -> bool {
        self.registry.is_registered_sensor(sensor)
    }

    /// Record snapshot; zero-valued for unknown identities
    pub fn get_sensor_info(&self, sensor: &Address) -> SensorRecord {
        self.registry.get_sensor_info(sensor)
    }

    /// Identities in registration order
    pub fn get_all_sensors(&self) -> Vec<Address> {
        self.registry.get_all_sensors()
    }

    /// Number of registered identities
    pub fn get_sensor_count(&self) -> u64 {
        self.registry.get_sensor_count()
    }

    /// Number of readings
    pub fn get_reading_count(&self) -> u64 {
        self.readings.get_reading_count()
    }

    /// Reading snapshot at `index`
    pub fn get_reading_by_index(&self, index: u64) -> Result<Reading> {
        self.readings.get_reading_by_index(index).cloned()
    }

    /// Readings of `sensor` in ledger order
    pub fn get_sensor_readings(&self, sensor: &Address) -> Vec<Reading> {
        self.readings.get_sensor_readings(sensor)
    }
}
