//! Translates source-clock snapshots to output nanosecond offsets.

use crate::domain::{ConverterError, OutputNanos};
use crate::event_source::ClockClass;

const EXPECTED_CLASS: &str = "monotonic";
const EXPECTED_FREQUENCY: u64 = 1_000_000;

/// Normalizes monotonic microsecond clock snapshots into nanosecond offsets
/// from the first observed event.
///
/// Asserts, on the first call, that the source clock matches the single
/// clock domain this converter supports: a monotonic clock at 1 MHz. A
/// divergent clock is a fatal error — this converter does not handle
/// multiple clock domains (see `SPEC_FULL.md`, §1 Non-goals).
#[derive(Debug, Default)]
pub struct ClockNormalizer {
    base: Option<u64>,
}

impl ClockNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a source clock snapshot to an output nanosecond offset.
    pub fn to_output_ns(
        &mut self,
        snapshot: u64,
        class: &ClockClass,
    ) -> Result<OutputNanos, ConverterError> {
        let base = match self.base {
            Some(base) => base,
            None => {
                if class.name != EXPECTED_CLASS || class.frequency != EXPECTED_FREQUENCY {
                    return Err(ConverterError::ClockAssumptionViolated {
                        class: class.name.clone(),
                        frequency: class.frequency,
                    });
                }
                self.base = Some(snapshot);
                snapshot
            }
        };

        Ok(OutputNanos((snapshot - base) * 1000))
    }
}
