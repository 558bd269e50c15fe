/// Dedupe gate for AI weather summaries
use crate::types::WeatherReading;
use std::sync::Mutex;

/// Composite key for "materially the same" weather. Numeric fields are
/// integer-rounded so floating-point noise between readings does not defeat
/// the comparison; the description is compared verbatim.
pub fn fingerprint(reading: &WeatherReading) -> String {
    format!(
        "{}|{}|{}|{}",
        reading.temp.round() as i64,
        reading.feels_like.round() as i64,
        reading.description,
        reading.wind_speed.round() as i64,
    )
}

/// Suppresses a redundant summary request when current conditions fingerprint
/// the same as the last one issued. Purely an optimization against redundant
/// billed calls; a genuinely new fingerprint is never blocked.
///
/// The fingerprint is claimed before the upstream call is known to succeed,
/// so a failed generation does not retry automatically for the same
/// conditions. Only a new reading unblocks it.
#[derive(Default)]
pub struct SummaryGate {
    last_issued: Mutex<Option<String>>,
}

impl SummaryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the reading fingerprints identically to the last
    /// issued summary; otherwise claims the new fingerprint and returns true.
    pub fn should_generate(&self, reading: &WeatherReading) -> bool {
        let fp = fingerprint(reading);
        let mut last = self.last_issued.lock().unwrap();

        if last.as_deref() == Some(fp.as_str()) {
            return false;
        }

        *last = Some(fp);
        true
    }
}
