//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using a Tokio actor:
//! - One task performs every mutation, in mailbox order
//! - Each mutation holds the state write lock from gate to apply
//! - Readers take the read lock directly and never see a half-applied call
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Transport (RPC, CLI, tests, ...)             │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   write lock → plan → Storage::commit → apply         │
//! │                       │                               │
//! │                       ▼                               │
//! │        broadcast::Sender<LedgerEvent>                 │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    clock::Clock,
    metrics::Metrics,
    state::{LedgerState, Mutation},
    types::{Address, LedgerEvent, ReadingSubmission},
    Error, Result, Storage,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Register a sensor
    RegisterSensor {
        /// Identity making the call
        caller: Address,
        /// Identity being registered
        sensor: Address,
        /// Free-form location label
        location: String,
        /// Outcome channel
        response: oneshot::Sender<Result<LedgerEvent>>,
    },

    /// Revoke a sensor
    RevokeSensor {
        /// Identity making the call
        caller: Address,
        /// Identity being revoked
        sensor: Address,
        /// Outcome channel
        response: oneshot::Sender<Result<LedgerEvent>>,
    },

    /// Submit a reading as `caller`
    SubmitReading {
        /// Submitting sensor
        caller: Address,
        /// Measurement payload
        submission: ReadingSubmission,
        /// Outcome channel
        response: oneshot::Sender<Result<LedgerEvent>>,
    },

    /// Close storage and stop
    Shutdown {
        /// Signalled once storage is closed
        response: oneshot::Sender<()>,
    },
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Shared state, written only by this actor
    state: Arc<RwLock<LedgerState>>,

    /// Durable store (None for in-memory ledgers)
    storage: Option<Storage>,

    /// Acceptance time source
    clock: Arc<dyn Clock>,

    /// Metrics
    metrics: Metrics,

    /// Notification fan-out
    events: broadcast::Sender<LedgerEvent>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: Arc<RwLock<LedgerState>>,
        storage: Option<Storage>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        events: broadcast::Sender<LedgerEvent>,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            state,
            storage,
            clock,
            metrics,
            events,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::RegisterSensor {
                    caller,
                    sensor,
                    location,
                    response,
                } => {
                    let result = self.execute(|state| state.plan_register(&caller, sensor, location));
                    let _ = response.send(result);
                }

                LedgerMessage::RevokeSensor {
                    caller,
                    sensor,
                    response,
                } => {
                    let result = self.execute(|state| state.plan_revoke(&caller, sensor));
                    let _ = response.send(result);
                }

                LedgerMessage::SubmitReading {
                    caller,
                    submission,
                    response,
                } => {
                    let clock = Arc::clone(&self.clock);
                    let result =
                        self.execute(|state| state.plan_submit(&caller, submission, clock.as_ref()));
                    let _ = response.send(result);
                }

                LedgerMessage::Shutdown { response } => {
                    self.close_storage();
                    let _ = response.send(());
                    return;
                }
            }
        }

        // Mailbox closed: every handle was dropped
        self.close_storage();
    }

    /// Gate, persist and apply one mutation under the write lock
    fn execute<F>(&self, plan: F) -> Result<LedgerEvent>
    where
        F: FnOnce(&LedgerState) -> Result<Mutation>,
    {
        let started = Instant::now();
        let mut state = self.state.write();

        let mutation = match plan(&state) {
            Ok(mutation) => mutation,
            Err(e) => {
                if e.is_rejection() {
                    tracing::warn!(reason = e.reason(), "Call rejected: {}", e);
                    self.metrics.record_rejection(e.reason());
                } else {
                    tracing::error!("Error planning mutation: {}", e);
                }
                return Err(e);
            }
        };

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.commit(&mutation) {
                tracing::error!(sensor = %mutation.sensor(), "Error persisting mutation: {}", e);
                return Err(e);
            }
        }

        let event = state.apply(mutation);
        drop(state);

        match &event {
            LedgerEvent::ReadingSubmitted { index, reading } => tracing::info!(
                sensor = %reading.sensor,
                index,
                nonce = reading.nonce,
                "Reading accepted"
            ),
            other => tracing::info!(sensor = %other.sensor(), "{}", other.name()),
        }

        self.metrics.record_event(&event);
        self.metrics
            .record_commit_duration(started.elapsed().as_secs_f64());

        // No subscribers is not an error
        let _ = self.events.send(event.clone());

        Ok(event)
    }

    fn close_storage(&mut self) {
        if let Some(storage) = self.storage.take() {
            if let Err(e) = storage.close() {
                tracing::error!("Error closing storage: {}", e);
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Register a sensor
    pub async fn register_sensor(
        &self,
        caller: Address,
        sensor: Address,
        location: String,
    ) -> Result<LedgerEvent> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::RegisterSensor {
            caller,
            sensor,
            location,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Revoke a sensor
    pub async fn revoke_sensor(&self, caller: Address, sensor: Address) -> Result<LedgerEvent> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::RevokeSensor {
            caller,
            sensor,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Submit a reading
    pub async fn submit_reading(
        &self,
        caller: Address,
        submission: ReadingSubmission,
    ) -> Result<LedgerEvent> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::SubmitReading {
            caller,
            submission,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor, waiting until storage is closed
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Shutdown { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    async fn send(&self, msg: LedgerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: Arc<RwLock<LedgerState>>,
    storage: Option<Storage>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    events: broadcast::Sender<LedgerEvent>,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, storage, clock, metrics, events, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{access::Authority, clock::SystemClock, validation::ValidationPolicy};

    fn spawn() -> (LedgerHandle, Arc<RwLock<LedgerState>>, broadcast::Receiver<LedgerEvent>) {
        let state = Arc::new(RwLock::new(LedgerState::new(
            Authority::new(Address::new("admin")).unwrap(),
            ValidationPolicy::default(),
        )));
        let (events, rx) = broadcast::channel(16);
        let handle = spawn_ledger_actor(
            Arc::clone(&state),
            None,
            Arc::new(SystemClock),
            Metrics::new().unwrap(),
            events,
            16,
        );
        (handle, state, rx)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _, _) = spawn();
        handle.shutdown().await.unwrap();

        // Mailbox is gone after shutdown
        let result = handle
            .register_sensor(Address::new("admin"), Address::new("s1"), "Zone".to_string())
            .await;
        assert!(matches!(result, Err(Error::Concurrency(_))));
    }

    #[tokio::test]
    async fn test_actor_commits_and_notifies() {
        let (handle, state, mut rx) = spawn();
        let sensor = Address::new("sensor1");

        handle
            .register_sensor(Address::new("admin"), sensor.clone(), "Zone_1".to_string())
            .await
            .unwrap();
        handle
            .submit_reading(
                sensor.clone(),
                ReadingSubmission::new(45, 78, 25, 10, 2, "Moderate", 1),
            )
            .await
            .unwrap();

        assert_eq!(state.read().get_reading_count(), 1);
        assert!(matches!(rx.recv().await.unwrap(), LedgerEvent::SensorRegistered { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            LedgerEvent::ReadingSubmitted { index: 0, .. }
        ));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_emits_nothing() {
        let (handle, state, mut rx) = spawn();

        let result = handle
            .register_sensor(Address::new("intruder"), Address::new("s1"), "Zone".to_string())
            .await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        assert_eq!(state.read().get_sensor_count(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = crate::Config::in_memory("admin");
        config.storage.enabled = true;
        config.data_dir = temp_dir.path().to_path_buf();
        Storage::open(&config).unwrap().close().unwrap();

        let admin = Address::new("admin");
        let sensor = Address::new("sensor1");
        let mut initial = LedgerState::new(
            Authority::new(admin.clone()).unwrap(),
            ValidationPolicy::default(),
        );
        initial.register_sensor(&admin, sensor.clone(), "Zone_1").unwrap();
        let state = Arc::new(RwLock::new(initial));

        let metrics = Metrics::new().unwrap();
        let (events, mut rx) = broadcast::channel(16);
        let handle = spawn_ledger_actor(
            Arc::clone(&state),
            Some(Storage::open_read_only(&config).unwrap()),
            Arc::new(SystemClock),
            metrics.clone(),
            events,
            16,
        );

        let result = handle
            .submit_reading(
                sensor.clone(),
                ReadingSubmission::new(45, 78, 25, 10, 2, "Moderate", 1),
            )
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));

        assert_eq!(state.read().get_reading_count(), 0);
        assert_eq!(state.read().get_sensor_info(&sensor).last_nonce, 0);
        assert_eq!(metrics.readings_accepted.get(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        // Same for registry mutations
        let result = handle.revoke_sensor(admin, sensor.clone()).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(state.read().get_sensor_info(&sensor).is_active);
        assert_eq!(metrics.sensors_revoked.get(), 0);

        handle.shutdown().await.unwrap();
    }
}
