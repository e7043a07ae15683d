//! Sample arrays for the pump, transition and probe segments.
//!
//! Segments only ever hold one period (pump), one pulse (transition) or one block (probe).
//! Repetition is left to the device via the sequence descriptor.

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use num_traits::Float;

use crate::{
    cycle::{CycleParameters, PROBE_SEGMENT_POINTS, ResolvedCounts},
    error::{DomainError, EncodingError},
    sequence::SequenceLayout,
};

pub const PUMP: &str = "pump";
pub const TRANSITION: &str = "transition";
pub const PROBE: &str = "probe";
pub const SECOND_PROBE: &str = "probetwo";
pub const TRIGGER_PUMP: &str = "trPump";
pub const TRIGGER_TRANSITION: &str = "trTransition";
pub const TRIGGER_PROBE: &str = "trProbe";
pub const TRIGGER_SECOND_PROBE: &str = "trProbetwo";

/// Wide enough for any value in [-1, 1] with 3 decimals.
pub type FormattedSample = heapless::String<16>;

/// Format a sample the way the instrument expects it, fixed point with 3 decimals.
pub fn format_sample(value: f64) -> FormattedSample {
    let mut out = FormattedSample::new();
    // Only fails on overflow, which a sample within range cannot cause.
    let _ = write!(out, "{:.3}", value);
    out
}

/// Value of the sample after formatting to 3 decimals.
fn wire_value(value: f64) -> f64 {
    Float::round(value * 1000.0) / 1000.0
}

fn check_range(segment: &'static str, value: f64) -> Result<f64, DomainError> {
    if (-1.0..=1.0).contains(&wire_value(value)) {
        Ok(value)
    } else {
        Err(DomainError::SampleOutOfRange { segment, value })
    }
}

/// Named arbitrary waveform segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    name: String,
    samples: Vec<f64>,
}

impl Segment {
    /// Create a segment, checking the name is usable on the instrument.
    ///
    /// Names must start with a letter and only contain letters, digits and underscores.
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Result<Self, EncodingError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, samples })
    }

    /// For the fixed names above, which are known to be valid.
    fn known(name: &'static str, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples as they go on the wire.
    pub fn formatted(&self) -> impl Iterator<Item = FormattedSample> + '_ {
        self.samples.iter().map(|&value| format_sample(value))
    }
}

/// Check a segment or sequence name.
pub fn validate_name(name: &str) -> Result<(), EncodingError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EncodingError::InvalidName(name.into()))
    }
}

/// The segments making up one channel's cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSet {
    pub pump: Segment,
    /// Empty when the duty cycle leaves no whole sample high.
    pub transition: Segment,
    pub probe: Segment,
    /// Only present for the dual-probe layout.
    pub second_probe: Option<Segment>,
}

impl SegmentSet {
    /// All segments, in upload order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        [&self.pump, &self.transition, &self.probe]
            .into_iter()
            .chain(self.second_probe.as_ref())
    }

    /// Look up a segment by name.
    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.iter().find(|segment| segment.name() == name)
    }
}

/// Build the pump-probe segments for one cycle.
///
/// Every sample has `offset` added, including the probes.
pub fn generate(
    resolved: &ResolvedCounts,
    params: &CycleParameters,
) -> Result<SegmentSet, DomainError> {
    let period_points = resolved.period_points;
    let high_points = resolved.high_points();

    let low = params.offset;
    let high = params.pump_amplitude + params.offset;
    if high_points > 0 {
        check_range(PUMP, high)?;
    }
    if high_points < period_points {
        check_range(PUMP, low)?;
    }
    let probe = check_range(PROBE, params.probe_amplitude + params.offset)?;
    let second_probe = params
        .second_probe_amplitude
        .map(|amplitude| check_range(SECOND_PROBE, amplitude + params.offset))
        .transpose()?;

    let set = SegmentSet {
        pump: Segment::known(PUMP, pulse_train(period_points, high_points, high, low)),
        transition: Segment::known(TRANSITION, alloc::vec![high; high_points]),
        probe: Segment::known(PROBE, alloc::vec![probe; PROBE_SEGMENT_POINTS]),
        second_probe: second_probe
            .map(|value| Segment::known(SECOND_PROBE, alloc::vec![value; PROBE_SEGMENT_POINTS])),
    };
    log::debug!(
        "Generated segments: pump {} points ({} high), transition {} points, probe {} points",
        set.pump.len(),
        high_points,
        set.transition.len(),
        set.probe.len()
    );
    Ok(set)
}

/// Build the trigger segments, high while pumping and low while probing.
///
/// The dual-probe layout gets its own low `trProbetwo` block so both channels play the same
/// number of steps.
pub fn generate_trigger(resolved: &ResolvedCounts, layout: SequenceLayout) -> SegmentSet {
    let second_probe = match layout {
        SequenceLayout::SingleProbe => None,
        SequenceLayout::DualProbe => Some(Segment::known(
            TRIGGER_SECOND_PROBE,
            alloc::vec![0.0; PROBE_SEGMENT_POINTS],
        )),
    };
    SegmentSet {
        pump: Segment::known(TRIGGER_PUMP, alloc::vec![1.0; resolved.period_points]),
        transition: Segment::known(TRIGGER_TRANSITION, alloc::vec![1.0; resolved.high_points()]),
        probe: Segment::known(TRIGGER_PROBE, alloc::vec![0.0; PROBE_SEGMENT_POINTS]),
        second_probe,
    }
}

/// One period, high for the first `high_points` samples.
fn pulse_train(period_points: usize, high_points: usize, high: f64, low: f64) -> Vec<f64> {
    (0..period_points)
        .map(|i| if i < high_points { high } else { low })
        .collect()
}
