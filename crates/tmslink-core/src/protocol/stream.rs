//! Byte-stream transports

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Byte stream the comm loop drives: the serial port, or a stand-in for tests
pub trait Transport: Read + Write + Send {
    /// Get number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Human readable name for logs
    fn name(&self) -> String {
        "transport".to_string()
    }
}

/// Serial port wrapper implementing Transport
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an open port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }

    fn name(&self) -> String {
        self.port.name().unwrap_or_else(|| "serial".to_string())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        (**self).bytes_to_read()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
