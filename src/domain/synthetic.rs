// Synthetic telemetry for demo mode
use super::telemetry::TelemetrySample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ALARM_CODE: &str = "HIGH_VIB";
pub const ALARM_PROBABILITY: f64 = 0.002;

/// Period divisor for the shared oscillation, in milliseconds.
const OSCILLATION_MS: f64 = 5000.0;

/// Center, oscillation amplitude and jitter for one synthesized reading.
#[derive(Debug, Clone, Copy)]
struct Channel {
    center: f64,
    amplitude: f64,
    jitter: f64,
}

impl Channel {
    const fn new(center: f64, amplitude: f64, jitter: f64) -> Self {
        Self {
            center,
            amplitude,
            jitter,
        }
    }

    fn read(&self, base: f64, rng: &mut impl Rng) -> f64 {
        self.center + base * self.amplitude + rng.gen_range(-self.jitter..=self.jitter)
    }
}

const RPM: Channel = Channel::new(3600.0, 25.0, 4.0);
const EXHAUST_C: Channel = Channel::new(480.0, 10.0, 1.5);
const LOAD_MW: Channel = Channel::new(45.0, 4.0, 0.4);
const PRESSURE_RATIO: Channel = Channel::new(12.0, 0.0, 0.15);
const VIBRATION: Channel = Channel::new(2.0, 0.0, 0.3);

/// Produces a smoothly oscillating baseline with bounded noise.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample_at(&mut self, ts: i64) -> TelemetrySample {
        let base = (ts as f64 / OSCILLATION_MS).sin();
        let rng = &mut self.rng;

        TelemetrySample {
            ts,
            rpm: Some(RPM.read(base, rng)),
            t_exhaust_c: Some(EXHAUST_C.read(base, rng)),
            combustor_p_r: Some(PRESSURE_RATIO.read(base, rng)),
            load_mw: Some(LOAD_MW.read(base, rng)),
            vib_mm_s: Some(VIBRATION.read(base, rng)),
            alarm: rng
                .gen_bool(ALARM_PROBABILITY)
                .then(|| ALARM_CODE.to_string()),
        }
    }

    /// `count` samples spaced `spacing_ms` apart, oldest first, the last one at `end_ts`.
    pub fn backfill(&mut self, end_ts: i64, count: usize, spacing_ms: i64) -> Vec<TelemetrySample> {
        (0..count)
            .rev()
            .map(|steps_back| self.sample_at(end_ts - steps_back as i64 * spacing_ms))
            .collect()
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(value: Option<f64>, channel: Channel) -> bool {
        let value = value.unwrap();
        let spread = channel.amplitude + channel.jitter;
        value >= channel.center - spread && value <= channel.center + spread
    }

    #[test]
    fn test_readings_stay_within_band() {
        let mut generator = SyntheticGenerator::seeded(7);
        for i in 0..2_000 {
            let sample = generator.sample_at(1_700_000_000_000 + i * 1000);
            assert!(within(sample.rpm, RPM));
            assert!(within(sample.t_exhaust_c, EXHAUST_C));
            assert!(within(sample.load_mw, LOAD_MW));
            assert!(within(sample.combustor_p_r, PRESSURE_RATIO));
            assert!(within(sample.vib_mm_s, VIBRATION));
            if let Some(alarm) = sample.alarm {
                assert_eq!(alarm, ALARM_CODE);
            }
        }
    }

    #[test]
    fn test_baseline_follows_oscillation() {
        let mut generator = SyntheticGenerator::seeded(1);
        // sin peaks at pi/2 and bottoms at 3pi/2.
        let peak_ts = (std::f64::consts::FRAC_PI_2 * OSCILLATION_MS) as i64;
        let trough_ts = (3.0 * std::f64::consts::FRAC_PI_2 * OSCILLATION_MS) as i64;

        let peak = generator.sample_at(peak_ts).rpm.unwrap();
        let trough = generator.sample_at(trough_ts).rpm.unwrap();
        assert!(peak - trough > 2.0 * (RPM.amplitude - RPM.jitter));
    }

    #[test]
    fn test_backfill_spacing_and_end() {
        let mut generator = SyntheticGenerator::seeded(3);
        let samples = generator.backfill(100_000, 30, 1000);

        assert_eq!(samples.len(), 30);
        assert_eq!(samples.first().map(|s| s.ts), Some(71_000));
        assert_eq!(samples.last().map(|s| s.ts), Some(100_000));
        assert!(samples.windows(2).all(|w| w[1].ts - w[0].ts == 1000));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = SyntheticGenerator::seeded(42);
        let mut b = SyntheticGenerator::seeded(42);
        assert_eq!(a.sample_at(123_456), b.sample_at(123_456));
    }
}
