//! Device communication client.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::{SerialPort, SerialPortType};

/// USB identifiers reported by the firmware's CDC-ACM interface.
pub const DEVICE_VID: u16 = 0x303a;
pub const DEVICE_PID: u16 = 0x4001;

/// Line the firmware's background task logs once per period.
pub const HEARTBEAT_LINE: &[u8] = b"[BG] Hello World dewe\n";

/// Largest write the firmware accepts per received packet.
pub const PACKET_SIZE: usize = 64;

/// Find CDC ports belonging to the firmware by USB VID/PID.
pub fn find_data_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;

    let data_ports = ports
        .into_iter()
        .filter(|port_info| match &port_info.port_type {
            SerialPortType::UsbPort(usb) => usb.vid == DEVICE_VID && usb.pid == DEVICE_PID,
            _ => false,
        })
        .map(|port_info| port_info.port_name)
        .collect();

    Ok(data_ports)
}

/// Find a single data port. Returns error if none found.
pub fn find_data_port() -> Result<String> {
    let ports = find_data_ports()?;
    match ports.into_iter().next() {
        Some(port) => Ok(port),
        None => anyhow::bail!("No data port found - ensure device is connected"),
    }
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_data_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Remove every complete heartbeat line from a captured stream.
pub fn strip_heartbeats(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;

    while !rest.is_empty() {
        if rest.starts_with(HEARTBEAT_LINE) {
            rest = &rest[HEARTBEAT_LINE.len()..];
        } else {
            out.push(rest[0]);
            rest = &rest[1..];
        }
    }

    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Client for communicating with the CDC log firmware.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl DeviceClient {
    /// Create a new device client.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let mut port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;

        // The firmware waits for DTR before moving data
        port.write_data_terminal_ready(true)?;

        Ok(Self {
            port,
            timeout: Duration::from_secs(3),
        })
    }

    /// Set the response timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Drain all pending data from the serial port.
    /// Reads until no more data is available (with a short timeout).
    pub fn drain_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;

        let mut buf = [0u8; 256];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue, // Keep reading
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Write bytes, split into packets the firmware accepts.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        for packet in data.chunks(PACKET_SIZE) {
            self.port.write_all(packet)?;
            self.port.flush()?;
            // Keep each write in its own USB transfer
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    /// Read until `done` accepts the captured bytes or the timeout expires.
    fn read_until<F>(&mut self, mut done: F) -> Result<Vec<u8>>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut data = Vec::new();
        let mut buf = [0u8; 256];
        let start = Instant::now();

        while start.elapsed() < self.timeout {
            match self.port.read(&mut buf) {
                Ok(n) => {
                    data.extend_from_slice(&buf[..n]);
                    if done(&data) {
                        return Ok(data);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        anyhow::bail!(
            "Timeout after {:?}, got {} bytes: {:?}",
            self.timeout,
            data.len(),
            String::from_utf8_lossy(&data)
        );
    }

    /// Wait for the next complete heartbeat line.
    pub fn wait_heartbeat(&mut self) -> Result<()> {
        self.read_until(|data| contains(data, HEARTBEAT_LINE))?;
        Ok(())
    }

    /// Send bytes and wait for them to come back, ignoring heartbeat lines.
    pub fn echo(&mut self, data: &[u8]) -> Result<()> {
        self.send_bytes(data)?;
        self.read_until(|captured| contains(&strip_heartbeats(captured), data))?;
        Ok(())
    }
}
