//! The ordered command script which puts a pump-probe cycle on the generator.
//!
//! The order is part of the protocol: segments must exist before a sequence referencing them
//! is uploaded, volatile memory is only cleared once the sequence is stored, and the outputs
//! are enabled last. Aborting before the outputs are enabled leaves the device inert.

use alloc::{format, string::String, vec::Vec};
use core::fmt;

use fugit::HertzU32;

use crate::{
    block::EncodedBlock,
    cycle::{CycleParameters, resolve},
    error::{EncodingError, Error, Result, SynthesisError},
    segment::{Segment, SegmentSet, generate, generate_trigger},
    sequence::{CYCLE_SEQUENCE, SequenceDescriptor, SequenceLayout, TRIGGER_SEQUENCE, compile},
    session::ScpiSession,
    types::{Channel, State},
};

/// Arbitrary waveform settings of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    pub sample_rate: HertzU32,
    /// Arbitrary waveform anti-aliasing filter.
    pub filter: State,
    /// Full scale of the channel in volts peak-to-peak. Sample values are fractions of this.
    pub peak_to_peak_v: f64,
}

impl ChannelConfig {
    /// 10 MSa/s, no filter, 6 Vpp.
    pub const fn pump_probe() -> Self {
        Self {
            sample_rate: HertzU32::MHz(10),
            filter: State::Off,
            peak_to_peak_v: 6.0,
        }
    }

    /// 10 MSa/s, no filter, 3 Vpp.
    pub const fn trigger() -> Self {
        Self {
            sample_rate: HertzU32::MHz(10),
            filter: State::Off,
            peak_to_peak_v: 3.0,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::pump_probe()
    }
}

/// Where the cycle (and optionally its trigger) goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramOptions {
    pub cycle_channel: Channel,
    pub cycle_config: ChannelConfig,
    /// Channel and settings for the trigger waveform, if one is wanted.
    pub trigger: Option<(Channel, ChannelConfig)>,
}

impl Default for ProgramOptions {
    /// Single channel generator, no trigger.
    fn default() -> Self {
        Self {
            cycle_channel: Channel::Default,
            cycle_config: ChannelConfig::pump_probe(),
            trigger: None,
        }
    }
}

impl ProgramOptions {
    /// Cycle on channel 1, trigger on channel 2.
    pub fn with_trigger() -> Self {
        Self {
            cycle_channel: Channel::Source1,
            cycle_config: ChannelConfig::pump_probe(),
            trigger: Some((Channel::Source2, ChannelConfig::trigger())),
        }
    }
}

/// Everything one channel needs, already encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProgram {
    channel: Channel,
    config: ChannelConfig,
    segments: SegmentSet,
    descriptor: SequenceDescriptor,
    block: EncodedBlock,
}

impl ChannelProgram {
    /// Encode `descriptor` and check every segment it references can be uploaded.
    pub fn new(
        channel: Channel,
        config: ChannelConfig,
        segments: SegmentSet,
        descriptor: SequenceDescriptor,
    ) -> core::result::Result<Self, EncodingError> {
        let names: Vec<&str> = segments.iter().map(Segment::name).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(EncodingError::DuplicateSegment((*name).into()));
            }
        }
        for name in descriptor.segment_names() {
            match segments.get(name) {
                Some(segment) if !segment.is_empty() => {}
                _ => return Err(EncodingError::UnknownSegment(name.into())),
            }
        }

        let block = descriptor.encode()?;
        Ok(Self {
            channel,
            config,
            segments,
            descriptor,
            block,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn segments(&self) -> &SegmentSet {
        &self.segments
    }

    pub fn descriptor(&self) -> &SequenceDescriptor {
        &self.descriptor
    }

    pub fn block(&self) -> &EncodedBlock {
        &self.block
    }

    /// Segments referenced by the sequence, in order of first use.
    fn uploads(&self) -> impl Iterator<Item = &Segment> {
        self.descriptor
            .segment_names()
            .into_iter()
            .filter_map(|name| self.segments.get(name))
    }

    /// Location of the stored sequence in internal flash, quoted.
    fn store_path(&self) -> String {
        format!("\"INT:\\{}.seq\"", self.descriptor.name())
    }
}

/// Turn the cycle parameters into ready-to-send channel programs.
///
/// All numeric and encoding checks happen here, before any device I/O.
pub fn plan(
    params: &CycleParameters,
    options: &ProgramOptions,
) -> core::result::Result<Vec<ChannelProgram>, SynthesisError> {
    let resolved = resolve(params)?;
    let layout = match params.second_probe_amplitude {
        Some(_) => SequenceLayout::DualProbe,
        None => SequenceLayout::SingleProbe,
    };

    let segments = generate(&resolved, params)?;
    let descriptor = compile(CYCLE_SEQUENCE, &segments, &resolved, layout)?;
    let mut programs = Vec::new();
    programs.push(ChannelProgram::new(
        options.cycle_channel,
        options.cycle_config,
        segments,
        descriptor,
    )?);

    if let Some((channel, config)) = options.trigger {
        let segments = generate_trigger(&resolved, layout);
        let descriptor = compile(TRIGGER_SEQUENCE, &segments, &resolved, layout)?;
        programs.push(ChannelProgram::new(channel, config, segments, descriptor)?);
    }
    Ok(programs)
}

/// One step of the command script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    /// Plain command.
    Text(String),
    /// `DATA:ARB` upload of a segment.
    Segment(Channel, &'a Segment),
    /// `DATA:SEQ` upload of an encoded sequence.
    Sequence(Channel, &'a EncodedBlock),
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Text(text) => f.write_str(text),
            Command::Segment(channel, segment) => write!(
                f,
                "{}DATA:ARB {},<{} points>",
                channel.prefix(),
                segment.name(),
                segment.len()
            ),
            Command::Sequence(channel, block) => write!(
                f,
                "{}DATA:SEQ {}",
                channel.prefix(),
                block.as_str()
            ),
        }
    }
}

/// The full, ordered command script for `programs`.
pub fn script(programs: &[ChannelProgram]) -> Vec<Command<'_>> {
    let mut commands = Vec::new();

    for program in programs {
        let prefix = program.channel.prefix();
        let config = &program.config;
        commands.push(Command::Text(format!(
            "{}FUNC:ARB:SRATE {:e}",
            prefix,
            config.sample_rate.to_Hz() as f64
        )));
        commands.push(Command::Text(format!(
            "{}FUNC:ARB:FILTER {}",
            prefix,
            config.filter.as_scpi()
        )));
        commands.push(Command::Text(format!(
            "{}FUNC:ARB:PTPEAK {}",
            prefix, config.peak_to_peak_v
        )));
    }

    for program in programs {
        for segment in program.uploads() {
            commands.push(Command::Segment(program.channel, segment));
        }
        commands.push(Command::Sequence(program.channel, &program.block));
    }

    for program in programs {
        commands.push(Command::Text(format!(
            "{}FUNC:ARB {}",
            program.channel.prefix(),
            program.descriptor.name()
        )));
        commands.push(Command::Text(format!(
            "MMEM:STORE:DATA{} {}",
            program.channel.suffix(),
            program.store_path()
        )));
    }

    for program in programs {
        commands.push(Command::Text(format!(
            "{}DATA:VOL:CLEAR",
            program.channel.prefix()
        )));
    }

    for program in programs {
        let prefix = program.channel.prefix();
        let path = program.store_path();
        commands.push(Command::Text(format!(
            "MMEM:LOAD:DATA{} {}",
            program.channel.suffix(),
            path
        )));
        commands.push(Command::Text(format!("{}FUNC ARB", prefix)));
        commands.push(Command::Text(format!("{}FUNC:ARB {}", prefix, path)));
    }

    if programs.len() > 1 {
        commands.push(Command::Text("FUNC:ARB:SYNC".into()));
    }

    for program in programs {
        commands.push(Command::Text(format!(
            "OUTP{} {}",
            program.channel.suffix(),
            State::On.as_scpi()
        )));
    }

    commands
}

/// Send the command script, one blocking command at a time.
///
/// There is no rollback. If the link fails part way [`Error::Interrupted`] reports how many
/// commands made it; once the outputs are on, switching them off again is up to the caller.
pub fn apply<S: embedded_io::Read + embedded_io::Write, const L: usize>(
    session: &mut ScpiSession<S, L>,
    programs: &[ChannelProgram],
) -> Result<(), S::Error> {
    let commands = script(programs);
    let total = commands.len();
    log::info!(
        "Uploading {} channel program(s) in {} commands",
        programs.len(),
        total
    );

    for (completed, command) in commands.iter().enumerate() {
        let result = match command {
            Command::Text(text) => session.send(text),
            Command::Segment(channel, segment) => session.upload_segment(*channel, segment),
            Command::Sequence(channel, block) => {
                session.send_block(&format!("{}DATA:SEQ", channel.prefix()), block)
            }
        };
        match result {
            Ok(()) => {}
            Err(Error::SerialError(error)) => {
                log::warn!(
                    "Command script interrupted at `{}` after {} of {} commands",
                    command,
                    completed,
                    total
                );
                return Err(Error::Interrupted {
                    completed,
                    total,
                    error,
                });
            }
            Err(other) => return Err(other),
        }
    }

    log::info!("Outputs enabled");
    Ok(())
}

/// Plan and apply in one go. Nothing is sent unless planning succeeds.
pub fn run<S: embedded_io::Read + embedded_io::Write, const L: usize>(
    session: &mut ScpiSession<S, L>,
    params: &CycleParameters,
    options: &ProgramOptions,
) -> Result<Vec<ChannelProgram>, S::Error> {
    let programs = plan(params, options)?;
    apply(session, &programs)?;
    Ok(programs)
}
