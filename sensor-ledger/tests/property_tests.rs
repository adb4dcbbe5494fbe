//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Anti-replay: only strictly increasing nonces are accepted
//! - Append-only: an index keeps returning the same reading
//! - Independence: sensors' nonce sequences never interact
//! - Range gate: first violated bound wins
//! - Access control: only the authority mutates the registry

use proptest::prelude::*;
use sensor_ledger::{Address, Config, Error, ReadingSubmission, SensorLedger};

const ADMIN: &str = "0xadmin";

/// Strategy for generating in-range submissions with a given nonce
fn submission_strategy(nonce: u64) -> impl Strategy<Value = ReadingSubmission> {
    (0u32..=500, 0u32..=500, any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
        move |(pm25, pm10, no2, so2, co)| {
            ReadingSubmission::new(pm25, pm10, no2, so2, co, "Moderate", nonce)
        },
    )
}

/// Create in-memory test ledger with one registered sensor
async fn create_test_ledger(sensors: &[&str]) -> SensorLedger {
    let ledger = SensorLedger::open(Config::in_memory(ADMIN)).await.unwrap();
    let admin = Address::new(ADMIN);
    for (i, sensor) in sensors.iter().enumerate() {
        ledger
            .register_sensor(&admin, &Address::new(*sensor), format!("Zone_{}", i + 1))
            .await
            .unwrap();
    }
    ledger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: a nonce is accepted iff it is above the watermark, and the
    /// watermark then equals it
    #[test]
    fn prop_only_increasing_nonces_accepted(nonces in prop::collection::vec(0u64..40, 1..40)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger(&["sensor1"]).await;
            let sensor = Address::new("sensor1");
            let mut watermark = 0u64;
            let mut accepted = 0u64;

            for nonce in nonces {
                let result = ledger
                    .submit_reading(&sensor, ReadingSubmission::new(45, 78, 25, 10, 2, "Moderate", nonce))
                    .await;

                if nonce > watermark {
                    prop_assert!(result.is_ok());
                    watermark = nonce;
                    accepted += 1;
                } else {
                    let is_replay = matches!(result, Err(Error::NonceNotIncreasing { .. }));
                    prop_assert!(is_replay);
                }

                prop_assert_eq!(ledger.get_sensor_info(&sensor).last_nonce, watermark);
                prop_assert_eq!(ledger.get_reading_count(), accepted);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: earlier readings never change when later ones are appended
    #[test]
    fn prop_append_only_indices_stable(
        submissions in prop::collection::vec(submission_strategy(0), 1..25)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger(&["sensor1"]).await;
            let sensor = Address::new("sensor1");
            let mut seen = Vec::new();

            for (i, mut submission) in submissions.into_iter().enumerate() {
                submission.nonce = i as u64 + 1;
                ledger.submit_reading(&sensor, submission).await.unwrap();
                seen.push(ledger.get_reading_by_index(i as u64).unwrap());

                for (j, earlier) in seen.iter().enumerate() {
                    prop_assert_eq!(&ledger.get_reading_by_index(j as u64).unwrap(), earlier);
                }
            }

            let count = ledger.get_reading_count();
            let out_of_range = matches!(
                ledger.get_reading_by_index(count),
                Err(Error::IndexOutOfRange { .. })
            );
            prop_assert!(out_of_range);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: two sensors' watermarks evolve independently
    #[test]
    fn prop_sensors_independent(
        steps in prop::collection::vec((any::<bool>(), 0u64..20), 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger(&["sensor1", "sensor2"]).await;
            let sensors = [Address::new("sensor1"), Address::new("sensor2")];
            let mut watermarks = [0u64; 2];

            for (second, nonce) in steps {
                let which = usize::from(second);
                let result = ledger
                    .submit_reading(
                        &sensors[which],
                        ReadingSubmission::new(10, 20, 30, 40, 50, "Good", nonce),
                    )
                    .await;
                prop_assert_eq!(result.is_ok(), nonce > watermarks[which]);
                if nonce > watermarks[which] {
                    watermarks[which] = nonce;
                }
            }

            for (sensor, watermark) in sensors.iter().zip(watermarks) {
                prop_assert_eq!(ledger.get_sensor_info(sensor).last_nonce, watermark);
                let readings = ledger.get_sensor_readings(sensor);
                prop_assert!(readings.iter().all(|r| &r.sensor == sensor));
                prop_assert!(readings.windows(2).all(|w| w[0].nonce < w[1].nonce));
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: PM bounds are inclusive and PM2.5 is checked first
    #[test]
    fn prop_range_gate(pm25 in 0u32..1000, pm10 in 0u32..1000) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger(&["sensor1"]).await;
            let sensor = Address::new("sensor1");

            let result = ledger
                .submit_reading(&sensor, ReadingSubmission::new(pm25, pm10, 1, 1, 1, "Moderate", 1))
                .await;

            match result {
                Ok(_) => prop_assert!(pm25 <= 500 && pm10 <= 500),
                Err(Error::Pm25TooHigh { value, .. }) => prop_assert!(value == pm25 && pm25 > 500),
                Err(Error::Pm10TooHigh { value, .. }) => {
                    prop_assert!(value == pm10 && pm25 <= 500 && pm10 > 500)
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }

            // Rejections never move the watermark
            let expected = if pm25 <= 500 && pm10 <= 500 { 1 } else { 0 };
            prop_assert_eq!(ledger.get_sensor_info(&sensor).last_nonce, expected);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: non-authority callers can neither register nor revoke
    #[test]
    fn prop_only_authority_mutates_registry(caller in "0x[a-f0-9]{1,8}") {
        prop_assume!(caller != ADMIN);

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger(&["sensor1"]).await;
            let caller = Address::new(caller);
            let sensor = Address::new("sensor1");

            let register = ledger.register_sensor(&caller, &caller, "Zone_X").await;
            prop_assert!(matches!(register, Err(Error::Unauthorized)));

            let revoke = ledger.revoke_sensor(&caller, &sensor).await;
            prop_assert!(matches!(revoke, Err(Error::Unauthorized)));

            prop_assert_eq!(ledger.get_sensor_count(), 1);
            prop_assert!(ledger.get_sensor_info(&sensor).is_active);
            prop_assert!(!ledger.is_registered_sensor(&caller));

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
