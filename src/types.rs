//! This module contains small types shared by the SCPI command builders.

use strum_macros::{EnumIter, IntoStaticStr};

/// Used to be less ambiguous and whether something is on or off.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

impl State {
    /// SCPI token, `ON` or `OFF`.
    pub fn as_scpi(self) -> &'static str {
        self.into()
    }
}

/// Output channel of the generator.
///
/// Single channel instruments take commands without a source prefix, which is what
/// [`Channel::Default`] produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Channel {
    /// No source prefix, the instrument's default channel.
    #[default]
    Default,
    /// `SOUR1:`
    Source1,
    /// `SOUR2:`
    Source2,
}

impl Channel {
    /// Prefix for source subsystem commands, e.g. `SOUR1:`.
    pub fn prefix(self) -> &'static str {
        match self {
            Channel::Default => "",
            Channel::Source1 => "SOUR1:",
            Channel::Source2 => "SOUR2:",
        }
    }

    /// Suffix for channel numbered commands, e.g. `MMEM:STORE:DATA1`.
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Default => "",
            Channel::Source1 => "1",
            Channel::Source2 => "2",
        }
    }
}
