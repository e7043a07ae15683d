//! Sequence descriptors, the instrument-side playlist of named segments.
//!
//! A descriptor serializes as
//! `"<sequence>","<segment>",<count>,<repeat mode>,<jump mode>,<marker>,...` and is sent
//! to the device as a definite-length block.

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use strum_macros::{EnumIter, IntoStaticStr};

use crate::{
    block::EncodedBlock,
    cycle::ResolvedCounts,
    error::EncodingError,
    segment::{SECOND_PROBE, Segment, SegmentSet, validate_name},
};

/// Name of the pump-probe sequence.
pub const CYCLE_SEQUENCE: &str = "Cs_cycle";
/// Name of the trigger sequence.
pub const TRIGGER_SEQUENCE: &str = "Cs_trigger";
/// Marker point used on every step of single channel designs.
pub const DEFAULT_MARKER_POINT: usize = 5;

/// How often a step is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum RepeatMode {
    /// Play `repeat_count` times.
    Repeat,
    /// Play exactly once, the count is ignored by the instrument.
    Once,
}

/// What the marker output does during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum JumpMode {
    Maintain,
    HighAtStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    pub segment: String,
    pub repeat_count: usize,
    pub repeat_mode: RepeatMode,
    pub jump_mode: JumpMode,
    pub marker_point: usize,
}

impl SequenceStep {
    /// Play `segment` `count` times, keeping the marker state.
    pub fn repeat(segment: &Segment, count: usize) -> Self {
        Self {
            segment: segment.name().into(),
            repeat_count: count,
            repeat_mode: RepeatMode::Repeat,
            jump_mode: JumpMode::Maintain,
            marker_point: DEFAULT_MARKER_POINT,
        }
    }

    /// Play `segment` once with the marker high at its start.
    ///
    /// The count goes on the wire as `0`.
    pub fn once(segment: &Segment) -> Self {
        Self {
            segment: segment.name().into(),
            repeat_count: 0,
            repeat_mode: RepeatMode::Once,
            jump_mode: JumpMode::HighAtStart,
            marker_point: DEFAULT_MARKER_POINT,
        }
    }

    /// Whether the step plays any samples at all.
    fn plays(&self) -> bool {
        match self.repeat_mode {
            RepeatMode::Repeat => self.repeat_count > 0,
            RepeatMode::Once => true,
        }
    }
}

/// Which steps make up one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum SequenceLayout {
    /// pump, transition, probe.
    #[default]
    SingleProbe,
    /// pump, transition, probe, then pump, transition, second probe.
    DualProbe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    name: String,
    steps: Vec<SequenceStep>,
}

impl SequenceDescriptor {
    pub fn new(name: impl Into<String>, steps: Vec<SequenceStep>) -> Result<Self, EncodingError> {
        let name = name.into();
        validate_name(&name)?;
        if steps.is_empty() {
            return Err(EncodingError::EmptySequence);
        }
        for step in &steps {
            validate_name(&step.segment)?;
        }
        Ok(Self { name, steps })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    /// Names of the referenced segments, in order of first use.
    pub fn segment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !names.contains(&step.segment.as_str()) {
                names.push(&step.segment);
            }
        }
        names
    }

    /// The comma separated descriptor body.
    pub fn body(&self) -> String {
        let mut body = String::new();
        // Writing to a String cannot fail.
        let _ = write!(body, "\"{}\"", self.name);
        for step in &self.steps {
            let repeat_mode: &'static str = step.repeat_mode.into();
            let jump_mode: &'static str = step.jump_mode.into();
            let _ = write!(
                body,
                ",\"{}\",{},{},{},{}",
                step.segment, step.repeat_count, repeat_mode, jump_mode, step.marker_point
            );
        }
        body
    }

    /// Frame the body as a definite-length block.
    pub fn encode(&self) -> Result<EncodedBlock, EncodingError> {
        EncodedBlock::encode(&self.body())
    }
}

/// Lay out the pump-probe steps for `segments`.
///
/// Steps which play nothing are left out: the pump when there are no pump pulses, the
/// transition when it has no samples and the probe when it is never repeated.
///
/// The dual-probe layout needs `segments.second_probe`.
pub fn compile(
    name: &str,
    segments: &SegmentSet,
    resolved: &ResolvedCounts,
    layout: SequenceLayout,
) -> Result<SequenceDescriptor, EncodingError> {
    let mut steps = Vec::new();
    push_cycle(&mut steps, segments, &segments.probe, resolved);
    if layout == SequenceLayout::DualProbe {
        let second = segments
            .second_probe
            .as_ref()
            .ok_or_else(|| EncodingError::UnknownSegment(SECOND_PROBE.into()))?;
        push_cycle(&mut steps, segments, second, resolved);
    }

    let descriptor = SequenceDescriptor::new(name, steps)?;
    for segment in descriptor.segment_names() {
        if segments.get(segment).is_none() {
            return Err(EncodingError::UnknownSegment(segment.into()));
        }
    }
    log::debug!("Compiled sequence {}", descriptor.body());
    Ok(descriptor)
}

fn push_cycle(
    steps: &mut Vec<SequenceStep>,
    segments: &SegmentSet,
    probe: &Segment,
    resolved: &ResolvedCounts,
) {
    let cycle = [
        SequenceStep::repeat(&segments.pump, resolved.pump_pulses),
        SequenceStep::once(&segments.transition),
        SequenceStep::repeat(probe, resolved.probe_length),
    ];
    for step in cycle {
        let empty = segments
            .get(&step.segment)
            .is_some_and(|segment| segment.is_empty());
        if step.plays() && !empty {
            steps.push(step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::decode,
        cycle::{CycleParametersBuilder, resolve},
        segment::{generate, generate_trigger},
    };
    use strum::IntoEnumIterator;

    fn counts(pump_pulses: usize, probe_length: usize, duty_points: f64) -> ResolvedCounts {
        ResolvedCounts {
            period_points: 100,
            duty_points,
            pump_pulses,
            probe_length,
        }
    }

    fn segments(high_points: usize) -> SegmentSet {
        let params = CycleParametersBuilder::new(1.0, 0.0)
            .with_second_probe(0.3)
            .build()
            .unwrap();
        generate(&counts(0, 0, high_points as f64), &params).unwrap()
    }

    #[test]
    fn mode_tokens() {
        let repeat: Vec<&str> = RepeatMode::iter().map(Into::into).collect();
        assert_eq!(repeat, ["repeat", "once"]);
        let jump: Vec<&str> = JumpMode::iter().map(Into::into).collect();
        assert_eq!(jump, ["maintain", "highAtStart"]);
    }

    #[test]
    fn single_probe_body() {
        let descriptor = compile(
            CYCLE_SEQUENCE,
            &segments(10),
            &counts(87, 75144, 10.0),
            SequenceLayout::SingleProbe,
        )
        .unwrap();
        assert_eq!(
            descriptor.body(),
            "\"Cs_cycle\",\"pump\",87,repeat,maintain,5,\"transition\",0,once,highAtStart,5,\"probe\",75144,repeat,maintain,5"
        );
        assert_eq!(descriptor.segment_names(), ["pump", "transition", "probe"]);
    }

    #[test]
    fn dual_probe_body() {
        let descriptor = compile(
            CYCLE_SEQUENCE,
            &segments(10),
            &counts(3, 40, 10.0),
            SequenceLayout::DualProbe,
        )
        .unwrap();
        assert_eq!(
            descriptor.body(),
            "\"Cs_cycle\",\"pump\",3,repeat,maintain,5,\"transition\",0,once,highAtStart,5,\"probe\",40,repeat,maintain,5,\
             \"pump\",3,repeat,maintain,5,\"transition\",0,once,highAtStart,5,\"probetwo\",40,repeat,maintain,5"
        );
        assert_eq!(
            descriptor.segment_names(),
            ["pump", "transition", "probe", "probetwo"]
        );
    }

    #[test]
    fn dual_trigger_plays_its_own_second_probe() {
        let trigger = generate_trigger(&counts(3, 40, 10.0), SequenceLayout::DualProbe);
        let descriptor = compile(
            TRIGGER_SEQUENCE,
            &trigger,
            &counts(3, 40, 10.0),
            SequenceLayout::DualProbe,
        )
        .unwrap();
        assert_eq!(descriptor.steps().len(), 6);
        assert_eq!(descriptor.steps()[2].segment, "trProbe");
        assert_eq!(descriptor.steps()[5].segment, "trProbetwo");
    }

    #[test]
    fn dual_probe_needs_second_probe() {
        let mut single = segments(10);
        single.second_probe = None;
        let result = compile(
            CYCLE_SEQUENCE,
            &single,
            &counts(3, 40, 10.0),
            SequenceLayout::DualProbe,
        );
        assert_eq!(result, Err(EncodingError::UnknownSegment("probetwo".into())));

        let trigger = generate_trigger(&counts(3, 40, 10.0), SequenceLayout::SingleProbe);
        let result = compile(
            TRIGGER_SEQUENCE,
            &trigger,
            &counts(3, 40, 10.0),
            SequenceLayout::DualProbe,
        );
        assert_eq!(result, Err(EncodingError::UnknownSegment("probetwo".into())));
    }

    #[test]
    fn zero_pump_pulses_drop_pump_step() {
        let descriptor = compile(
            CYCLE_SEQUENCE,
            &segments(10),
            &counts(0, 100, 10.0),
            SequenceLayout::SingleProbe,
        )
        .unwrap();
        let names: Vec<&str> = descriptor.steps().iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(names, ["transition", "probe"]);
    }

    #[test]
    fn empty_transition_drops_transition_step() {
        let descriptor = compile(
            CYCLE_SEQUENCE,
            &segments(0),
            &counts(5, 100, 0.0),
            SequenceLayout::SingleProbe,
        )
        .unwrap();
        assert_eq!(descriptor.segment_names(), ["pump", "probe"]);
    }

    #[test]
    fn nothing_to_play_is_an_error() {
        let result = compile(
            CYCLE_SEQUENCE,
            &segments(0),
            &counts(0, 0, 0.0),
            SequenceLayout::SingleProbe,
        );
        assert_eq!(result, Err(EncodingError::EmptySequence));
    }

    #[test]
    fn encoded_descriptor_round_trips() {
        let params = CycleParametersBuilder::new(1.0, 0.025)
            .with_gyromagnetic_ratio(3500.0)
            .with_duty_cycle(0.1)
            .build()
            .unwrap();
        let resolved = resolve(&params).unwrap();
        let segments = generate(&resolved, &params).unwrap();
        let descriptor =
            compile(CYCLE_SEQUENCE, &segments, &resolved, SequenceLayout::SingleProbe).unwrap();
        let block = descriptor.encode().unwrap();
        assert_eq!(block.length(), alloc::format!("{}", descriptor.body().len()));
        assert_eq!(decode(block.as_str()), Ok(descriptor.body().as_str()));
    }

    #[test]
    fn invalid_sequence_name() {
        let step = SequenceStep::repeat(&segments(1).probe, 1);
        assert_eq!(
            SequenceDescriptor::new("Cs cycle", alloc::vec![step]),
            Err(EncodingError::InvalidName("Cs cycle".into()))
        );
    }
}
