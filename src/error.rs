//! Our error types for waveform synthesis and the SCPI session.

use alloc::string::String;
use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// A numeric precondition of the pump-probe cycle was violated.
///
/// Always raised before any command reaches the device.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Field strength must be positive, got {0} uT")]
    NonPositiveFieldStrength(f64),
    #[error("Gyromagnetic ratio must be positive, got {0} Hz/uT")]
    NonPositiveGyromagneticRatio(f64),
    #[error("Total cycle time must be positive, got {0} s")]
    NonPositiveTotalTime(f64),
    #[error("Total cycle points must be non-zero")]
    ZeroTotalPoints,
    #[error("Pump time must be zero or positive, got {0} s")]
    NegativePumpTime(f64),
    #[error("Duty cycle must be within [0, 1], got {0}")]
    DutyCycleOutOfRange(f64),
    #[error("Parameter `{0}` is not a finite number")]
    NotFinite(&'static str),
    #[error("Larmor period of {period_s} s is shorter than one sample at {total_points} points per {total_time_s} s")]
    PeriodTooShort {
        period_s: f64,
        total_time_s: f64,
        total_points: usize,
    },
    #[error("Larmor period of {period_s} s is longer than the whole {total_time_s} s cycle of {total_points} points")]
    PeriodTooLong {
        period_s: f64,
        total_time_s: f64,
        total_points: usize,
    },
    #[error("Pumping takes {pump_points} of {total_points} points, no room left for probing")]
    NoProbeWindow {
        pump_points: f64,
        total_points: usize,
    },
    #[error("Segment `{segment}` sample {value} is outside [-1, 1]")]
    SampleOutOfRange { segment: &'static str, value: f64 },
}

/// The sequence descriptor could not be framed as a definite-length block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Block must start with '#'")]
    MissingHeader,
    #[error("Invalid length digit in block header")]
    InvalidLengthDigit,
    #[error("Payload of {0} bytes needs more than 9 length digits")]
    LengthOverflow(usize),
    #[error("Block header declares {declared} payload bytes but {actual} follow")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Sequence has no steps")]
    EmptySequence,
    #[error("Sequence step references unknown segment `{0}`")]
    UnknownSegment(String),
    #[error("Segment name `{0}` is used twice")]
    DuplicateSegment(String),
    #[error("Name `{0}` is not a valid waveform name")]
    InvalidName(String),
}

/// Anything that can go wrong before the device is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Custom error type for SCPI generator communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Invalid response received")]
    InvalidResponse,
    #[error("Response does not fit the receive buffer")]
    BufferError,
    /// The command script stopped part way. The device may hold uploaded data in an
    /// inconsistent state and the caller has to decide whether to restart from the top.
    #[error("Serial communication error after {completed} of {total} commands, device state is inconsistent")]
    Interrupted {
        completed: usize,
        total: usize,
        error: I,
    },
}

impl<I: embedded_io::Error> From<DomainError> for Error<I> {
    fn from(err: DomainError) -> Self {
        Error::Synthesis(err.into())
    }
}

impl<I: embedded_io::Error> From<EncodingError> for Error<I> {
    fn from(err: EncodingError) -> Self {
        Error::Synthesis(err.into())
    }
}
