use std::net::TcpStream;
use std::time::Duration;

use inquire::{Confirm, CustomType, Select, Text};
use pump_probe_scpi::{
    CycleParametersBuilder, ProgramOptions, ScpiSession, plan,
    sequencer::{self, script},
};

// Configuration constants - adjust these for your setup
const SCPI_PORT: u16 = 5025;
const BAUD_RATE: u32 = 115200;
// Segment uploads are large, the generator can take a while to accept them.
const IO_TIMEOUT_MS: u64 = 5000;

/// Any std byte stream we can talk SCPI over.
pub struct PortWrapper(Box<dyn Stream>);

pub trait Stream: std::io::Read + std::io::Write {}
impl<T: std::io::Read + std::io::Write> Stream for T {}

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused => embedded_io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::ConnectionAborted => embedded_io::ErrorKind::ConnectionAborted,
            std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                embedded_io::ErrorKind::TimedOut
            }
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn connect() -> PortWrapper {
    let timeout = Some(Duration::from_millis(IO_TIMEOUT_MS));
    let transport = Select::new("Connect over:", vec!["LAN socket", "Serial port"])
        .prompt()
        .expect("Failed to select transport");

    if transport == "LAN socket" {
        let host = Text::new("Generator address:")
            .with_default("10.33.62.201")
            .prompt()
            .expect("Failed to read address");
        let stream =
            TcpStream::connect((host.as_str(), SCPI_PORT)).expect("Failed to connect to generator");
        stream.set_read_timeout(timeout).expect("Failed to set timeout");
        stream.set_write_timeout(timeout).expect("Failed to set timeout");
        return PortWrapper(Box::new(stream));
    }

    let ports = serialport::available_ports().expect("Failed to enumerate serial ports");
    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }
    let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();
    let port_name = Select::new("Select a serial port:", port_names)
        .prompt()
        .expect("Failed to select port");

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(Duration::from_millis(IO_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");
    PortWrapper(Box::new(port))
}

fn ask(prompt: &str, default: f64) -> f64 {
    CustomType::<f64>::new(prompt)
        .with_default(default)
        .prompt()
        .expect("Failed to read value")
}

fn main() {
    env_logger::init();

    let field_strength = ask("Field strength in uT (up to 35):", 10.0);
    let pump_time = ask("Pump time in s:", 0.025);
    let pump_amplitude = ask("Pump amplitude (fraction of Vpp):", 0.8);
    let probe_amplitude = ask("Probe amplitude (fraction of Vpp):", 0.1);
    let duty_cycle = ask("Pump duty cycle:", 0.2);
    let offset = ask("Offset (fraction of Vpp):", 0.0);

    let mut builder = CycleParametersBuilder::new(field_strength, pump_time)
        .with_amplitudes(pump_amplitude, probe_amplitude)
        .with_duty_cycle(duty_cycle)
        .with_offset(offset);
    if Confirm::new("Add a second probe?")
        .with_default(false)
        .prompt()
        .expect("Failed to confirm")
    {
        builder = builder.with_second_probe(ask("Second probe amplitude:", 0.2));
    }
    let params = match builder.build() {
        Ok(params) => params,
        Err(err) => {
            eprintln!("Invalid parameters: {}", err);
            std::process::exit(1);
        }
    };

    let options = if Confirm::new("Generate a trigger on channel 2?")
        .with_default(false)
        .prompt()
        .expect("Failed to confirm")
    {
        ProgramOptions::with_trigger()
    } else {
        ProgramOptions::default()
    };

    // Everything is checked before connecting.
    let programs = match plan(&params, &options) {
        Ok(programs) => programs,
        Err(err) => {
            eprintln!("Cannot build the cycle: {}", err);
            std::process::exit(1);
        }
    };

    println!("\n--- Command script ---");
    for command in script(&programs) {
        println!("{}", command);
    }

    if !Confirm::new("Send to the generator?")
        .with_default(true)
        .prompt()
        .expect("Failed to confirm")
    {
        return;
    }

    let mut session: ScpiSession<PortWrapper> = ScpiSession::new(connect());
    println!("Connected to device: {}", session.identify().unwrap());

    if let Err(err) = sequencer::apply(&mut session, &programs) {
        eprintln!("Upload failed: {}", err);
        std::process::exit(1);
    }
    println!("Pump-probe cycle running.");
}
