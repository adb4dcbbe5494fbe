//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `sensors` - Sensor records (key: registration sequence number, big-endian)
//! - `readings` - Append-only reading log (key: ledger index, big-endian)
//! - `meta` - Ledger metadata (authority the store was created for)
//!
//! Big-endian keys make RocksDB's byte order equal to registration order and
//! ledger order, so a full scan restores both sequences as they were.

use crate::{
    error::{Error, Result},
    state::Mutation,
    types::{Address, Reading, SensorRecord},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};

/// Column family names
const CF_SENSORS: &str = "sensors";
const CF_READINGS: &str = "readings";
const CF_META: &str = "meta";

/// Metadata keys
const META_AUTHORITY: &[u8] = b"authority";

/// Persisted form of a registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSensor {
    sensor: Address,
    record: SensorRecord,
}

/// Persisted ledger contents
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Sensors in registration order
    pub sensors: Vec<(Address, SensorRecord)>,
    /// Readings in ledger order
    pub readings: Vec<Reading>,
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.storage.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.storage.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.storage.max_background_jobs);

        if config.storage.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_SENSORS, Self::cf_options_sensors()),
            ColumnFamilyDescriptor::new(CF_READINGS, Self::cf_options_readings()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }

    /// Open an existing database that rejects every write
    #[cfg(test)]
    pub(crate) fn open_read_only(config: &Config) -> Result<Self> {
        let db = DB::open_cf_for_read_only(
            &Options::default(),
            &config.data_dir,
            [CF_SENSORS, CF_READINGS, CF_META],
            false,
        )?;
        Ok(Self { db })
    }

    // Column family options

    fn cf_options_sensors() -> Options {
        let mut opts = Options::default();
        // Small and read on every start-up
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_readings() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Metadata

    /// Bind the store to `authority`
    ///
    /// A fresh store records the authority; an existing store must have been
    /// created for the same one.
    pub fn bind_authority(&self, authority: &Address) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;

        match self.db.get_cf(cf, META_AUTHORITY)? {
            Some(stored) => {
                let stored: Address = bincode::deserialize(&stored)?;
                if &stored != authority {
                    return Err(Error::Config(format!(
                        "store was created for authority {}, configured authority is {}",
                        stored, authority
                    )));
                }
            }
            None => {
                self.db
                    .put_cf(cf, META_AUTHORITY, bincode::serialize(authority)?)?;
                tracing::info!(authority = %authority, "Bound new store to authority");
            }
        }

        Ok(())
    }

    // Mutations

    /// Persist a planned mutation (atomic)
    pub fn commit(&self, mutation: &Mutation) -> Result<()> {
        let mut batch = WriteBatch::default();
        let cf_sensors = self.cf_handle(CF_SENSORS)?;

        match mutation {
            Mutation::Register {
                sensor,
                seq,
                record,
            }
            | Mutation::Revoke {
                sensor,
                seq,
                record,
            } => {
                let value = bincode::serialize(&StoredSensor {
                    sensor: sensor.clone(),
                    record: record.clone(),
                })?;
                batch.put_cf(cf_sensors, seq.to_be_bytes(), value);
            }
            Mutation::Submit {
                seq,
                record,
                index,
                reading,
            } => {
                // Reading and watermark land in the same write
                let value = bincode::serialize(&StoredSensor {
                    sensor: reading.sensor.clone(),
                    record: record.clone(),
                })?;
                batch.put_cf(cf_sensors, seq.to_be_bytes(), value);

                let cf_readings = self.cf_handle(CF_READINGS)?;
                batch.put_cf(cf_readings, index.to_be_bytes(), bincode::serialize(reading)?);
            }
        }

        self.db.write(batch)?;

        tracing::debug!(sensor = %mutation.sensor(), "Mutation persisted");

        Ok(())
    }

    // Loading

    /// Read the full ledger back
    pub fn load(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();

        let cf_sensors = self.cf_handle(CF_SENSORS)?;
        for item in self.db.iterator_cf(cf_sensors, IteratorMode::Start) {
            let (_, value) = item?;
            let stored: StoredSensor = bincode::deserialize(&value)?;
            snapshot.sensors.push((stored.sensor, stored.record));
        }

        let cf_readings = self.cf_handle(CF_READINGS)?;
        for (expected, item) in self.db.iterator_cf(cf_readings, IteratorMode::Start).enumerate() {
            let (key, value) = item?;
            let index = decode_index(&key)?;
            if index != expected as u64 {
                return Err(Error::Storage(format!(
                    "Reading log has a gap: expected index {}, found {}",
                    expected, index
                )));
            }
            snapshot.readings.push(bincode::deserialize(&value)?);
        }

        tracing::info!(
            sensors = snapshot.sensors.len(),
            readings = snapshot.readings.len(),
            "Loaded ledger from storage"
        );

        Ok(snapshot)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

fn decode_index(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| Error::Storage(format!("Invalid reading key length {}", key.len())))?;
    Ok(u64::from_be_bytes(bytes))
}
