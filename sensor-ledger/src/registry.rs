//! Sensor registry
//!
//! Maps sensor identity to its registration record and remembers the order
//! in which sensors were admitted. Records are never removed: revocation only
//! clears `is_active`, so a revoked identity can never be registered again.

use crate::{
    access::Authority,
    types::{Address, SensorRecord},
    Error, Result,
};
use std::collections::HashMap;

/// Registry of admitted sensors
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    /// Fixed authority
    authority: Authority,

    /// Registration sequence number and record, by identity
    records: HashMap<Address, (u64, SensorRecord)>,

    /// Identities in registration order
    order: Vec<Address>,
}

impl SensorRegistry {
    /// Create an empty registry owned by `authority`
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Authority identity
    pub fn authority(&self) -> &Address {
        self.authority.address()
    }

    // Gates (no mutation)

    /// Check a registration without applying it
    pub fn check_register(&self, caller: &Address, sensor: &Address) -> Result<()> {
        self.authority.ensure(caller)?;

        if self.records.contains_key(sensor) {
            return Err(Error::AlreadyRegistered);
        }

        Ok(())
    }

    /// Check a revocation and return the record as it will be after it
    pub fn check_revoke(&self, caller: &Address, sensor: &Address) -> Result<SensorRecord> {
        self.authority.ensure(caller)?;

        let (_, record) = self.records.get(sensor).ok_or(Error::NotRegistered)?;

        Ok(SensorRecord {
            is_active: false,
            ..record.clone()
        })
    }

    // Mutations

    /// Register a sensor (authority only, one-time per identity)
    pub fn register_sensor(
        &mut self,
        caller: &Address,
        sensor: Address,
        location: impl Into<String>,
    ) -> Result<()> {
        self.check_register(caller, &sensor)?;
        self.insert(sensor, SensorRecord::active(location));
        Ok(())
    }

    /// Revoke a sensor (authority only); revoking twice is allowed
    pub fn revoke_sensor(&mut self, caller: &Address, sensor: &Address) -> Result<()> {
        let revoked = self.check_revoke(caller, sensor)?;
        self.replace(sensor, revoked);
        Ok(())
    }

    /// Append a record that already passed its gate
    pub(crate) fn insert(&mut self, sensor: Address, record: SensorRecord) {
        let seq = self.order.len() as u64;
        self.order.push(sensor.clone());
        self.records.insert(sensor, (seq, record));
    }

    /// Overwrite an existing record that already passed its gate
    pub(crate) fn replace(&mut self, sensor: &Address, record: SensorRecord) {
        if let Some((_, existing)) = self.records.get_mut(sensor) {
            *existing = record;
        }
    }

    // Queries

    /// Record of a registered sensor
    pub fn get(&self, sensor: &Address) -> Option<&SensorRecord> {
        self.records.get(sensor).map(|(_, record)| record)
    }

    /// True if the identity has a record (active or revoked)
    pub fn is_registered_sensor(&self, sensor: &Address) -> bool {
        self.records.contains_key(sensor)
    }

    /// Record snapshot; zero-valued for unknown identities
    pub fn get_sensor_info(&self, sensor: &Address) -> SensorRecord {
        self.get(sensor).cloned().unwrap_or_default()
    }

    /// Identities in registration order
    pub fn get_all_sensors(&self) -> Vec<Address> {
        self.order.clone()
    }

    /// Number of registered identities (revoked included)
    pub fn get_sensor_count(&self) -> u64 {
        self.order.len() as u64
    }

    /// Registration sequence number of `sensor`
    pub(crate) fn position(&self, sensor: &Address) -> Option<u64> {
        self.records.get(sensor).map(|(seq, _)| *seq)
    }
}
