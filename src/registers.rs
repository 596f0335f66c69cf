//! Register value assembly
//!
//! Values are one or two holding registers wide. Two-register values are
//! big-endian by word: the first register holds the high 16 bits.

use crate::config::RegisterSpec;
use crate::error::{Result, WallwatchError};
use crate::modbus::RegisterTransport;

/// Combine registers into an unsigned value, first register most significant
pub fn combine_registers(registers: &[u16]) -> u32 {
    registers
        .iter()
        .fold(0u32, |acc, &reg| (acc << 16) | u32::from(reg))
}

/// Reads single- and double-register values over an open transport
pub struct RegisterReader<'a> {
    transport: &'a mut dyn RegisterTransport,
}

impl<'a> RegisterReader<'a> {
    pub fn new(transport: &'a mut dyn RegisterTransport) -> Self {
        Self { transport }
    }

    /// Read `length` registers at `address` and assemble them.
    ///
    /// Lengths other than 1 or 2 fail with `UnsupportedLength` before any
    /// request is sent.
    pub async fn read(&mut self, address: u16, length: u16) -> Result<u32> {
        if length != 1 && length != 2 {
            return Err(WallwatchError::unsupported_length(address, length));
        }

        let registers = self
            .transport
            .read_holding_registers(address, length)
            .await?;
        if registers.len() < length as usize {
            return Err(WallwatchError::read(format!(
                "Short response at {}: expected {} registers, got {}",
                address,
                length,
                registers.len()
            )));
        }

        Ok(combine_registers(&registers[..length as usize]))
    }

    pub async fn read_spec(&mut self, spec: RegisterSpec) -> Result<u32> {
        self.read(spec.address, spec.length).await
    }
}
