//! Sensor ledger node binary
//!
//! Usage: `sensor-ledger-server [config.toml]`. Without a path the
//! configuration is read from `SENSOR_LEDGER_*` environment variables.

use sensor_ledger::{Address, Config, Error, LedgerEvent, SensorLedger};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };

    tracing::info!(
        "Starting {} {}",
        config.service_name,
        config.service_version
    );

    let ledger = SensorLedger::open(config).await?;

    // Log every notification
    let mut events = ledger.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LedgerEvent::SensorRegistered { sensor, location }) => {
                    tracing::info!(%sensor, %location, "SensorRegistered")
                }
                Ok(LedgerEvent::SensorRevoked { sensor }) => {
                    tracing::info!(%sensor, "SensorRevoked")
                }
                Ok(LedgerEvent::ReadingSubmitted { index, reading }) => tracing::info!(
                    index,
                    sensor = %reading.sensor,
                    aqi = %reading.aqi_category,
                    nonce = reading.nonce,
                    "ReadingSubmitted"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification logger lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Register bootstrap sensors as the authority
    let authority = ledger.authority();
    for entry in ledger.config().bootstrap.clone() {
        let sensor = Address::new(entry.sensor);
        match ledger
            .register_sensor(&authority, &sensor, entry.location)
            .await
        {
            Ok(_) => {}
            Err(Error::AlreadyRegistered) => {
                tracing::info!(%sensor, "Bootstrap sensor already registered")
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        sensors = ledger.get_sensor_count(),
        readings = ledger.get_reading_count(),
        "Ledger ready"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down sensor ledger");
    ledger.shutdown().await?;
    drop(ledger);
    logger.abort();

    Ok(())
}
