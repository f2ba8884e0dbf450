use crate::model::{Batch, Measurement};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::ops::Range;

pub const HUMIDITY_RANGE: Range<i32> = 30..60;
pub const CARBON_MONOXIDE_RANGE: Range<i32> = 50..100;
pub const TEMPERATURE_RANGE: Range<i32> = 10..50;

/// Source of wall-clock time for recorded timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces batches of synthetic readings for one device.
///
/// Identifiers are derived from the injected RNG, so a seeded generator yields
/// the same batch every run. Timestamps never go backwards within one
/// generator, even if the clock does.
pub struct MeasurementGenerator<R, C> {
    rng: R,
    clock: C,
    last_recorded: Option<DateTime<Utc>>,
    legacy_co_mirror: bool,
}

impl<R: Rng, C: Clock> MeasurementGenerator<R, C> {
    pub fn new(rng: R, clock: C) -> Self {
        Self {
            rng,
            clock,
            last_recorded: None,
            legacy_co_mirror: false,
        }
    }

    /// Reproduce the old firmware's draw sequence, where the carbon monoxide
    /// reading is overwritten by the temperature draw.
    pub fn with_legacy_co_mirror(mut self, enabled: bool) -> Self {
        self.legacy_co_mirror = enabled;
        self
    }

    pub fn generate(&mut self, serial_number: &str, count: usize) -> Batch {
        (0..count).map(|_| self.measurement(serial_number)).collect()
    }

    fn measurement(&mut self, serial_number: &str) -> Measurement {
        let air_humidity = self.rng.gen_range(HUMIDITY_RANGE);
        let mut carbon_monoxide = self.rng.gen_range(CARBON_MONOXIDE_RANGE);
        let temperature = self.rng.gen_range(TEMPERATURE_RANGE);
        if self.legacy_co_mirror {
            carbon_monoxide = temperature;
        }

        let mut id = [0u8; 16];
        self.rng.fill_bytes(&mut id);

        Measurement {
            id: uuid::Builder::from_random_bytes(id).into_uuid(),
            device_serial_number: serial_number.to_string(),
            recorded_time: self.next_timestamp(),
            air_humidity: f64::from(air_humidity),
            carbon_monoxide: f64::from(carbon_monoxide),
            temperature: f64::from(temperature),
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        let ts = match self.last_recorded {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_recorded = Some(ts);
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::collections::HashSet;

    /// Clock that steps backwards one second per call.
    struct RewindingClock {
        next: Cell<DateTime<Utc>>,
    }

    impl Clock for RewindingClock {
        fn now(&self) -> DateTime<Utc> {
            let now = self.next.get();
            self.next.set(now - Duration::seconds(1));
            now
        }
    }

    fn seeded(seed: u64) -> MeasurementGenerator<StdRng, SystemClock> {
        MeasurementGenerator::new(StdRng::seed_from_u64(seed), SystemClock)
    }

    #[test]
    fn test_generates_exact_count() {
        let batch = seeded(1).generate("DEV", 500);
        assert_eq!(batch.len(), 500);
        assert!(batch.iter().all(|m| m.device_serial_number == "DEV"));
        assert!(seeded(1).generate("DEV", 0).is_empty());
    }

    #[test]
    fn test_readings_within_ranges() {
        let batch = seeded(3).generate("DEV", 1000);

        for m in &batch {
            assert!((30.0..60.0).contains(&m.air_humidity));
            assert!((50.0..100.0).contains(&m.carbon_monoxide));
            assert!((10.0..50.0).contains(&m.temperature));
            assert_eq!(m.temperature.fract(), 0.0);
        }
    }

    #[test]
    fn test_ids_unique_and_v4() {
        let mut generator = seeded(4);
        let mut ids = HashSet::new();
        for _ in 0..5 {
            for m in generator.generate("DEV", 200) {
                assert_eq!(m.id.get_version_num(), 4);
                assert!(ids.insert(m.id));
            }
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let clock = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let fixed = || RewindingClock {
            next: Cell::new(clock),
        };
        let a = MeasurementGenerator::new(StdRng::seed_from_u64(9), fixed()).generate("DEV", 50);
        let b = MeasurementGenerator::new(StdRng::seed_from_u64(9), fixed()).generate("DEV", 50);

        assert_eq!(a, b);
    }

    #[test]
    fn test_timestamps_non_decreasing_when_clock_rewinds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = RewindingClock {
            next: Cell::new(start),
        };
        let mut generator = MeasurementGenerator::new(StdRng::seed_from_u64(5), clock);
        let batch = generator.generate("DEV", 10);

        assert!(batch.windows(2).all(|w| w[0].recorded_time <= w[1].recorded_time));
        assert!(batch.iter().all(|m| m.recorded_time == start));
    }

    #[test]
    fn test_independent_draws_by_default() {
        let batch = seeded(6).generate("DEV", 500);
        assert!(batch.iter().any(|m| m.carbon_monoxide != m.temperature));
    }

    #[test]
    fn test_legacy_co_mirror() {
        let mut generator = seeded(7).with_legacy_co_mirror(true);
        let batch = generator.generate("DEV", 200);

        for m in &batch {
            assert_eq!(m.carbon_monoxide, m.temperature);
            assert!((10.0..50.0).contains(&m.carbon_monoxide));
        }
    }
}
