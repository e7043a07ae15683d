//! Conversion of the physical pump-probe parameters into discrete sample counts.

use num_traits::Float;

use crate::error::DomainError;

/// Gyromagnetic ratio of caesium in Hz/uT (roughly 3.5 kHz/uT).
pub const CAESIUM_GYROMAGNETIC_RATIO: f64 = 3498.621;
/// Duration of one full pump-probe cycle in seconds.
pub const DEFAULT_TOTAL_TIME_S: f64 = 0.1;
/// Number of points in one full pump-probe cycle.
pub const DEFAULT_TOTAL_POINTS: usize = 1_000_000;
/// Number of points in the probe block which is repeated until the cycle is full.
pub const PROBE_SEGMENT_POINTS: usize = 10;

/// Physical description of one pump-probe cycle.
///
/// Amplitudes and offset are fractions of the channel's peak-to-peak range.
/// Use [`CycleParametersBuilder`] to get validated parameters with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleParameters {
    /// Magnetic field strength in uT.
    pub field_strength_ut: f64,
    /// Gyromagnetic ratio in Hz/uT.
    pub gyromagnetic_ratio: f64,
    /// Time spent pumping in seconds.
    pub pump_time_s: f64,
    pub pump_amplitude: f64,
    pub probe_amplitude: f64,
    /// Amplitude of the second probe in the dual-probe layout.
    pub second_probe_amplitude: Option<f64>,
    /// Fraction of each Larmor period during which the pump is high.
    pub duty_cycle: f64,
    /// Added to every sample, used to bias the EOM.
    pub offset: f64,
    /// Duration of the whole cycle in seconds.
    pub total_time_s: f64,
    /// Number of points in the whole cycle.
    pub total_points: usize,
}

impl CycleParameters {
    /// Check every precondition [`resolve`] relies on.
    pub fn validate(&self) -> Result<(), DomainError> {
        let finite = [
            ("field_strength_ut", self.field_strength_ut),
            ("gyromagnetic_ratio", self.gyromagnetic_ratio),
            ("pump_time_s", self.pump_time_s),
            ("pump_amplitude", self.pump_amplitude),
            ("probe_amplitude", self.probe_amplitude),
            ("duty_cycle", self.duty_cycle),
            ("offset", self.offset),
            ("total_time_s", self.total_time_s),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(DomainError::NotFinite(name));
            }
        }
        if self
            .second_probe_amplitude
            .is_some_and(|amplitude| !amplitude.is_finite())
        {
            return Err(DomainError::NotFinite("second_probe_amplitude"));
        }

        if self.field_strength_ut <= 0.0 {
            return Err(DomainError::NonPositiveFieldStrength(self.field_strength_ut));
        }
        if self.gyromagnetic_ratio <= 0.0 {
            return Err(DomainError::NonPositiveGyromagneticRatio(
                self.gyromagnetic_ratio,
            ));
        }
        if self.total_time_s <= 0.0 {
            return Err(DomainError::NonPositiveTotalTime(self.total_time_s));
        }
        if self.total_points == 0 {
            return Err(DomainError::ZeroTotalPoints);
        }
        if self.pump_time_s < 0.0 {
            return Err(DomainError::NegativePumpTime(self.pump_time_s));
        }
        if !(0.0..=1.0).contains(&self.duty_cycle) {
            return Err(DomainError::DutyCycleOutOfRange(self.duty_cycle));
        }
        Ok(())
    }

    /// Larmor frequency in Hz.
    pub fn larmor_frequency_hz(&self) -> f64 {
        self.field_strength_ut * self.gyromagnetic_ratio
    }

    /// Larmor period in seconds.
    pub fn larmor_period_s(&self) -> f64 {
        1.0 / self.larmor_frequency_hz()
    }
}

/// Use this type to create [`CycleParameters`].
#[derive(Debug, Clone)]
pub struct CycleParametersBuilder {
    params: CycleParameters,
}

impl CycleParametersBuilder {
    /// Start from a field strength (uT) and pump time (s).
    ///
    /// Defaults: caesium gyromagnetic ratio, pump amplitude `1.0`, probe amplitude `0.1`,
    /// 50% duty cycle, no offset and a 0.1 s cycle of 1 000 000 points.
    pub fn new(field_strength_ut: f64, pump_time_s: f64) -> Self {
        Self {
            params: CycleParameters {
                field_strength_ut,
                gyromagnetic_ratio: CAESIUM_GYROMAGNETIC_RATIO,
                pump_time_s,
                pump_amplitude: 1.0,
                probe_amplitude: 0.1,
                second_probe_amplitude: None,
                duty_cycle: 0.5,
                offset: 0.0,
                total_time_s: DEFAULT_TOTAL_TIME_S,
                total_points: DEFAULT_TOTAL_POINTS,
            },
        }
    }

    pub fn with_amplitudes(mut self, pump_amplitude: f64, probe_amplitude: f64) -> Self {
        self.params.pump_amplitude = pump_amplitude;
        self.params.probe_amplitude = probe_amplitude;
        self
    }

    /// Switch to the dual-probe layout with the given second probe amplitude.
    pub fn with_second_probe(mut self, amplitude: f64) -> Self {
        self.params.second_probe_amplitude = Some(amplitude);
        self
    }

    pub fn with_duty_cycle(mut self, duty_cycle: f64) -> Self {
        self.params.duty_cycle = duty_cycle;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.params.offset = offset;
        self
    }

    /// Duration and point count of the whole cycle.
    pub fn with_cycle(mut self, total_time_s: f64, total_points: usize) -> Self {
        self.params.total_time_s = total_time_s;
        self.params.total_points = total_points;
        self
    }

    pub fn with_gyromagnetic_ratio(mut self, ratio_hz_per_ut: f64) -> Self {
        self.params.gyromagnetic_ratio = ratio_hz_per_ut;
        self
    }

    /// Let's build it!
    pub fn build(self) -> Result<CycleParameters, DomainError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Discrete sample counts derived from [`CycleParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCounts {
    /// Samples per Larmor period, at least 1.
    pub period_points: usize,
    /// Samples of each period reserved for the pump being high. Only the whole part is used.
    pub duty_points: f64,
    /// Number of full periods spent pumping.
    pub pump_pulses: usize,
    /// Number of times the probe block is repeated.
    pub probe_length: usize,
}

impl ResolvedCounts {
    /// Samples per period during which the pump is high.
    pub fn high_points(&self) -> usize {
        // duty_points is within [0, period_points], so the cast cannot saturate.
        Float::floor(self.duty_points) as usize
    }

    /// Points spent pumping.
    pub fn pump_points(&self) -> usize {
        self.pump_pulses * self.period_points
    }

    /// Points spent probing.
    pub fn probe_points(&self) -> usize {
        self.probe_length * PROBE_SEGMENT_POINTS
    }
}

/// Work out how many samples each part of the cycle takes.
pub fn resolve(params: &CycleParameters) -> Result<ResolvedCounts, DomainError> {
    params.validate()?;

    let period_s = params.larmor_period_s();
    let period_points_f =
        Float::floor(period_s / params.total_time_s * params.total_points as f64);
    if period_points_f < 1.0 {
        return Err(DomainError::PeriodTooShort {
            period_s,
            total_time_s: params.total_time_s,
            total_points: params.total_points,
        });
    }
    // Also catches an infinite period from a vanishing field.
    if !period_points_f.is_finite() || period_points_f > params.total_points as f64 {
        return Err(DomainError::PeriodTooLong {
            period_s,
            total_time_s: params.total_time_s,
            total_points: params.total_points,
        });
    }

    let pump_periods = Float::floor(params.pump_time_s / period_s);
    let pump_points_f = pump_periods * period_points_f;
    if pump_points_f >= params.total_points as f64 {
        return Err(DomainError::NoProbeWindow {
            pump_points: pump_points_f,
            total_points: params.total_points,
        });
    }

    // Both values are now known to be at most total_points.
    let period_points = period_points_f as usize;
    let pump_points = pump_periods as usize * period_points;
    let pump_pulses = pump_points / period_points;
    let probe_length = (params.total_points - pump_points) / PROBE_SEGMENT_POINTS;

    let resolved = ResolvedCounts {
        period_points,
        duty_points: period_points as f64 * params.duty_cycle,
        pump_pulses,
        probe_length,
    };
    log::debug!(
        "Larmor period {:.3e} s -> {} points/period, {} pump pulses, {} probe blocks",
        period_s,
        resolved.period_points,
        resolved.pump_pulses,
        resolved.probe_length
    );
    Ok(resolved)
}
