//! Main ledger orchestration layer
//!
//! This module ties together storage, the writer actor and the shared state
//! into the operation set the ledger exposes to any transport.
//!
//! # Example
//!
//! ```no_run
//! use sensor_ledger::{Address, Config, ReadingSubmission, SensorLedger};
//!
//! #[tokio::main]
//! async fn main() -> sensor_ledger::Result<()> {
//!     let config = Config::in_memory("0xadmin");
//!     let ledger = SensorLedger::open(config).await?;
//!
//!     let admin = Address::new("0xadmin");
//!     let sensor = Address::new("0xsensor");
//!     ledger.register_sensor(&admin, &sensor, "Zone_1").await?;
//!     ledger
//!         .submit_reading(&sensor, ReadingSubmission::new(45, 78, 25, 10, 2, "Moderate", 1))
//!         .await?;
//!
//!     assert_eq!(ledger.get_reading_count(), 1);
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    access::Authority,
    actor::{spawn_ledger_actor, LedgerHandle},
    clock::{Clock, SystemClock},
    metrics::Metrics,
    state::LedgerState,
    types::{Address, LedgerEvent, Reading, ReadingSubmission, SensorRecord},
    validation::ValidationPolicy,
    Config, Error, Result, Storage,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Main ledger interface
///
/// Cheap to clone; all clones share the same writer and state.
#[derive(Clone)]
pub struct SensorLedger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Shared state (for reads)
    state: Arc<RwLock<LedgerState>>,

    /// Notification fan-out
    events: broadcast::Sender<LedgerEvent>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Arc<Config>,
}

impl SensorLedger {
    /// Open ledger with configuration, stamping readings with the wall clock
    pub async fn open(config: Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Open ledger with an explicit acceptance clock
    pub async fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let authority = Authority::new(config.authority_address())?;
        let policy = ValidationPolicy::from_config(&config.validation);

        // Open storage and restore state
        let (state, storage) = if config.storage.enabled {
            let storage = Storage::open(&config)?;
            storage.bind_authority(authority.address())?;
            let snapshot = storage.load()?;
            let state =
                LedgerState::restore(authority, policy, snapshot.sensors, snapshot.readings);
            (state, Some(storage))
        } else {
            (LedgerState::new(authority, policy), None)
        };

        let state = Arc::new(RwLock::new(state));
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        let (events, _) = broadcast::channel(config.actor.notification_capacity);

        // Spawn actor
        let handle = spawn_ledger_actor(
            Arc::clone(&state),
            storage,
            clock,
            metrics.clone(),
            events.clone(),
            config.actor.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            authority = %config.authority,
            persistent = config.storage.enabled,
            "Sensor ledger opened"
        );

        Ok(Self {
            handle,
            state,
            events,
            metrics,
            config: Arc::new(config),
        })
    }

    // Mutating operations

    /// Register a sensor (authority only)
    pub async fn register_sensor(
        &self,
        caller: &Address,
        sensor: &Address,
        location: impl Into<String>,
    ) -> Result<LedgerEvent> {
        self.handle
            .register_sensor(caller.clone(), sensor.clone(), location.into())
            .await
    }

    /// Revoke a sensor (authority only)
    pub async fn revoke_sensor(&self, caller: &Address, sensor: &Address) -> Result<LedgerEvent> {
        self.handle.revoke_sensor(caller.clone(), sensor.clone()).await
    }

    /// Submit a reading; the caller is the sensor
    pub async fn submit_reading(
        &self,
        caller: &Address,
        submission: ReadingSubmission,
    ) -> Result<LedgerEvent> {
        self.handle.submit_reading(caller.clone(), submission).await
    }

    // Read operations (any caller, consistent snapshot)

    /// Authority identity
    pub fn authority(&self) -> Address {
        self.state.read().authority().clone()
    }

    /// True if the identity has a record (active or revoked)
    pub fn is_registered_sensor(&self, sensor: &Address) -> bool {
        self.state.read().is_registered_sensor(sensor)
    }

    /// Record snapshot; zero-valued for unknown identities
    pub fn get_sensor_info(&self, sensor: &Address) -> SensorRecord {
        self.state.read().get_sensor_info(sensor)
    }

    /// Identities in registration order
    pub fn get_all_sensors(&self) -> Vec<Address> {
        self.state.read().get_all_sensors()
    }

    /// Number of registered identities
    pub fn get_sensor_count(&self) -> u64 {
        self.state.read().get_sensor_count()
    }

    /// Number of readings
    pub fn get_reading_count(&self) -> u64 {
        self.state.read().get_reading_count()
    }

    /// Reading at `index`
    pub fn get_reading_by_index(&self, index: u64) -> Result<Reading> {
        self.state.read().get_reading_by_index(index)
    }

    /// Readings of `sensor` in ledger order
    pub fn get_sensor_readings(&self, sensor: &Address) -> Vec<Reading> {
        self.state.read().get_sensor_readings(sensor)
    }

    // Plumbing

    /// Subscribe to notifications emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger, closing storage
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }
}

impl std::fmt::Debug for SensorLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorLedger")
            .field("service", &self.config.service_name)
            .field("authority", &self.config.authority)
            .finish()
    }
}
