//! Append-only reading ledger
//!
//! An arena of immutable readings addressed by a dense index. There is no
//! API to edit or remove an entry.

use crate::{types::{Address, Reading}, Error, Result};

/// Ordered sequence of accepted readings
#[derive(Debug, Clone, Default)]
pub struct ReadingLedger {
    readings: Vec<Reading>,
}

impl ReadingLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next appended reading will get
    pub fn next_index(&self) -> u64 {
        self.readings.len() as u64
    }

    /// Append a reading, returning its index
    pub(crate) fn append(&mut self, reading: Reading) -> u64 {
        let index = self.next_index();
        self.readings.push(reading);
        index
    }

    /// Number of readings
    pub fn get_reading_count(&self) -> u64 {
        self.readings.len() as u64
    }

    /// Reading at `index`
    pub fn get_reading_by_index(&self, index: u64) -> Result<&Reading> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.readings.get(i))
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.get_reading_count(),
            })
    }

    /// All readings of `sensor`, in ledger order
    pub fn get_sensor_readings(&self, sensor: &Address) -> Vec<Reading> {
        self.readings
            .iter()
            .filter(|r| &r.sensor == sensor)
            .cloned()
            .collect()
    }

    /// Iterate in ledger order
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }
}
