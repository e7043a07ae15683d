//! This crate synthesizes pump-probe waveforms for atomic magnetometry and uploads them to an
//! arbitrary waveform generator over SCPI.
//!
//! A pump-probe cycle is made of three segments:
//! * `pump` - one Larmor period with the pump held high for the duty cycle, repeated once per pump pulse.
//! * `transition` - a short high pulse played once between pumping and probing.
//! * `probe` - a 10 point block at probe amplitude, repeated until the cycle is full.
//!
//! The device only stores the three short segments plus a sequence telling it how often to repeat
//! each of them, so a one million point cycle costs a few kilobytes on the wire.
//!
//! It was written against the Keysight 33500B series (33522B), but any generator which accepts
//! `DATA:ARB` segments and `DATA:SEQ` definite-length blocks should work.
//!
//! The session works over any interface which implements [embedded_io::Read] & [embedded_io::Write],
//! e.g. a LAN socket on port 5025 or a USB serial bridge.
//!
//! ```ignore
//! let params = CycleParametersBuilder::new(10.0, 0.025)
//!     .with_amplitudes(0.8, 0.1)
//!     .with_duty_cycle(0.2)
//!     .build()?;
//! let plan = plan(&params, &ProgramOptions::default())?;
//! let mut session: ScpiSession<_> = ScpiSession::new(interface);
//! sequencer::apply(&mut session, &plan)?;
//! ```
//!
//! It supports `no-std` environments (with `alloc`) by use of the `no-std` feature flag.

#![cfg_attr(feature = "no-std", no_std)]

extern crate alloc;

pub mod block;
pub mod cycle;
pub mod error;
pub mod segment;
pub mod sequence;
pub mod sequencer;
pub mod session;
pub mod types;

#[cfg(test)]
mod mock_serial;

pub use cycle::{CycleParameters, CycleParametersBuilder, ResolvedCounts, resolve};
pub use sequencer::{ChannelConfig, ChannelProgram, ProgramOptions, plan};
pub use session::ScpiSession;
