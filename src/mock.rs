// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory bus for tests and host development
//!
//! Every slave address gets a 256-byte register map.  Writes set the
//! register pointer from their first byte and store the rest; reads
//! continue from the register pointer.

use std::collections::BTreeMap;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use nix::errno::Errno;

use crate::buffer::{self, Block, I2C_SMBUS_BLOCK_MAX};
use crate::core::{I2CBus, I2CTransfer};
use crate::error::{Error, Result};
use crate::flags::MessageFlags;
use crate::transaction::{self, Segment};

/// Registers of one simulated slave
#[derive(Clone)]
pub struct I2CRegisterMap {
    registers: [u8; 0x100],
    offset: u8,
}

impl Default for I2CRegisterMap {
    fn default() -> I2CRegisterMap {
        I2CRegisterMap::new()
    }
}

impl I2CRegisterMap {
    pub fn new() -> I2CRegisterMap {
        I2CRegisterMap {
            registers: [0x00; 0x100],
            offset: 0,
        }
    }

    /// Store `data` starting at `offset`, wrapping at the end of the map
    pub fn write_regs(&mut self, offset: u8, data: &[u8]) {
        let mut reg = offset;
        for &byte in data {
            self.registers[usize::from(reg)] = byte;
            reg = reg.wrapping_add(1);
        }
    }

    /// Copy `len` registers starting at `offset`
    pub fn read_regs(&self, offset: u8, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.registers[usize::from(offset.wrapping_add(i as u8))])
            .collect()
    }

    /// Fill `data` from the register pointer, advancing it
    fn read(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte = self.registers[usize::from(self.offset)];
            self.offset = self.offset.wrapping_add(1);
        }
    }

    /// First byte sets the register pointer, the rest is stored from there
    fn write(&mut self, data: &[u8]) {
        if let Some((&offset, rest)) = data.split_first() {
            self.write_regs(offset, rest);
            self.offset = offset.wrapping_add(rest.len() as u8);
        }
    }
}

/// Shape of one segment seen by `MockI2CBus::transfer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRecord {
    pub address: u16,
    pub flags: MessageFlags,
    pub len: usize,
}

/// Bus configuration as last set through `I2CBus`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockSettings {
    pub ten_bit_addressing: bool,
    pub retries: Option<u32>,
    pub timeout: Option<Duration>,
}

#[derive(Default)]
pub struct MockI2CBus {
    devices: BTreeMap<u16, I2CRegisterMap>,
    slave_address: Option<u16>,
    settings: MockSettings,
    transfers: Vec<Vec<SegmentRecord>>,
    config_log: Vec<&'static str>,
    fail_next: Option<Errno>,
    complete_only: Option<u32>,
}

impl MockI2CBus {
    pub fn new() -> MockI2CBus {
        MockI2CBus::default()
    }

    /// Register map of the slave at `address`, created on first use
    pub fn device(&mut self, address: u16) -> &mut I2CRegisterMap {
        self.devices.entry(address).or_insert_with(I2CRegisterMap::new)
    }

    /// Segments of every transfer so far, oldest first
    pub fn transfer_log(&self) -> &[Vec<SegmentRecord>] {
        &self.transfers
    }

    /// Names of the configuration calls made so far, oldest first
    pub fn config_log(&self) -> &[&'static str] {
        &self.config_log
    }

    pub fn settings(&self) -> MockSettings {
        self.settings
    }

    /// Make the next operation fail with `errno`
    pub fn fail_next(&mut self, errno: Errno) {
        self.fail_next = Some(errno);
    }

    /// Make transfers report only `count` completed segments
    pub fn complete_only(&mut self, count: u32) {
        self.complete_only = Some(count);
    }

    fn check(&mut self, op: &'static str) -> Result<()> {
        match self.fail_next.take() {
            Some(errno) => Err(Error::Ioctl { op, source: errno }),
            None => Ok(()),
        }
    }

    fn selected(&mut self, op: &'static str) -> Result<&mut I2CRegisterMap> {
        self.check(op)?;
        match self.slave_address {
            Some(address) => Ok(self.device(address)),
            None => Err(Error::Ioctl {
                op,
                source: Errno::EINVAL,
            }),
        }
    }
}

impl I2CBus for MockI2CBus {
    fn slave_address(&self) -> Option<u16> {
        self.slave_address
    }

    fn set_slave_address(&mut self, slave_address: u16) -> Result<()> {
        self.check("set_slave_address")?;
        self.config_log.push("set_slave_address");
        self.slave_address = Some(slave_address);
        Ok(())
    }

    fn set_ten_bit_addressing(&mut self, enable: bool) -> Result<()> {
        self.check("set_ten_bit_addressing")?;
        self.config_log.push("set_ten_bit_addressing");
        self.settings.ten_bit_addressing = enable;
        Ok(())
    }

    fn set_retries(&mut self, retries: u32) -> Result<()> {
        self.check("set_retries")?;
        self.config_log.push("set_retries");
        self.settings.retries = Some(retries);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.check("set_timeout")?;
        self.config_log.push("set_timeout");
        self.settings.timeout = Some(timeout);
        Ok(())
    }

    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        self.selected("read")?.read(data);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.selected("write")?.write(data);
        Ok(())
    }

    fn smbus_write_quick(&mut self, _bit: bool) -> Result<()> {
        self.selected("smbus_write_quick").map(drop)
    }

    fn smbus_read_byte(&mut self) -> Result<u8> {
        let mut byte = [0];
        self.selected("smbus_read_byte")?.read(&mut byte);
        Ok(byte[0])
    }

    fn smbus_write_byte(&mut self, value: u8) -> Result<()> {
        self.selected("smbus_write_byte")?.write(&[value]);
        Ok(())
    }

    fn smbus_read_byte_data(&mut self, register: u8) -> Result<u8> {
        Ok(self.selected("smbus_read_byte_data")?.read_regs(register, 1)[0])
    }

    fn smbus_write_byte_data(&mut self, register: u8, value: u8) -> Result<()> {
        self.selected("smbus_write_byte_data")?
            .write_regs(register, &[value]);
        Ok(())
    }

    fn smbus_read_word_data(&mut self, register: u8) -> Result<u16> {
        let regs = self.selected("smbus_read_word_data")?.read_regs(register, 2);
        // SMBus words travel low byte first
        Ok(LittleEndian::read_u16(&regs))
    }

    fn smbus_write_word_data(&mut self, register: u8, value: u16) -> Result<()> {
        let mut buf = [0; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.selected("smbus_write_word_data")?
            .write_regs(register, &buf);
        Ok(())
    }

    fn smbus_process_word(&mut self, register: u8, value: u16) -> Result<u16> {
        let mut buf = [0; 2];
        LittleEndian::write_u16(&mut buf, value);
        let regs = self.selected("smbus_process_word")?;
        regs.write_regs(register, &buf);
        Ok(LittleEndian::read_u16(&regs.read_regs(register, 2)))
    }

    fn smbus_read_block_data(&mut self, register: u8) -> Result<Vec<u8>> {
        // the count byte lives at `register`, data follows
        let raw = self
            .selected("smbus_read_block_data")?
            .read_regs(register, I2C_SMBUS_BLOCK_MAX + 1);
        Ok(Block::from_prefixed(&raw).to_vec())
    }

    fn smbus_read_i2c_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>> {
        let regs = self.selected("smbus_read_i2c_block_data")?;
        let len = buffer::i2c_block_read_len(len)?;
        Ok(regs.read_regs(register, len))
    }

    fn smbus_write_block_data(&mut self, register: u8, values: &[u8]) -> Result<()> {
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX)?;
        let raw = block.to_prefixed();
        self.selected("smbus_write_block_data")?
            .write_regs(register, &raw[..=block.len()]);
        Ok(())
    }

    fn smbus_write_i2c_block_data(&mut self, register: u8, values: &[u8]) -> Result<()> {
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX)?;
        self.selected("smbus_write_i2c_block_data")?
            .write_regs(register, block.as_slice());
        Ok(())
    }

    fn smbus_process_block(&mut self, register: u8, values: &[u8]) -> Result<Vec<u8>> {
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX - 1)?;
        let regs = self.selected("smbus_process_block")?;
        regs.write_regs(register, block.as_slice());
        Ok(regs.read_regs(register, block.len()))
    }
}

impl I2CTransfer for MockI2CBus {
    fn transfer(&mut self, segments: &mut [Segment]) -> Result<u32> {
        self.check("transfer")?;
        transaction::check_segments(segments)?;
        self.transfers.push(
            segments
                .iter()
                .map(|s| SegmentRecord {
                    address: s.address(),
                    flags: s.flags(),
                    len: s.buffer().capacity(),
                })
                .collect(),
        );
        for segment in segments.iter_mut() {
            let regs = self.device(segment.address());
            if segment.is_read() {
                regs.read(segment.buffer_mut().as_mut_slice());
            } else {
                regs.write(segment.buffer().as_slice());
            }
        }
        Ok(self.complete_only.unwrap_or(segments.len() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_at(address: u16) -> MockI2CBus {
        let mut bus = MockI2CBus::new();
        bus.set_slave_address(address).unwrap();
        bus
    }

    #[test]
    fn raw_write_then_read() {
        let mut bus = bus_at(0x52);
        bus.write(&[0x40, 7, 8]).unwrap();
        bus.write(&[0x40]).unwrap();
        let mut data = [0; 2];
        bus.read(&mut data).unwrap();
        assert_eq!(data, [7, 8]);
    }

    #[test]
    fn single_ops_need_a_selected_slave() {
        let mut bus = MockI2CBus::new();
        match bus.smbus_read_byte() {
            Err(Error::Ioctl {
                op: "smbus_read_byte",
                source: Errno::EINVAL,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn word_data_is_little_endian_on_the_wire() {
        let mut bus = bus_at(0x48);
        bus.smbus_write_word_data(0x02, 0x1234).unwrap();
        assert_eq!(bus.device(0x48).read_regs(0x02, 2), vec![0x34, 0x12]);
        assert_eq!(bus.smbus_read_word_data(0x02).unwrap(), 0x1234);
    }

    #[test]
    fn read_block_never_exceeds_limit() {
        let mut bus = bus_at(0x0b);
        bus.device(0x0b).write_regs(0x20, &[0xff; 64]);
        let block = bus.smbus_read_block_data(0x20).unwrap();
        assert_eq!(block.len(), I2C_SMBUS_BLOCK_MAX);
    }

    #[test]
    fn block_write_read_round_trip() {
        let mut bus = bus_at(0x0b);
        bus.smbus_write_block_data(0x10, &[1, 2, 3]).unwrap();
        assert_eq!(bus.smbus_read_block_data(0x10).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn i2c_block_read_respects_length() {
        let mut bus = bus_at(0x50);
        bus.smbus_write_i2c_block_data(0x00, &[9, 8, 7, 6]).unwrap();
        assert_eq!(bus.smbus_read_i2c_block_data(0x00, 3).unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn i2c_block_read_length_is_exact_or_an_error() {
        let mut bus = bus_at(0x50);
        bus.device(0x50).write_regs(0x00, &[0x5a; 40]);
        assert_eq!(bus.smbus_read_i2c_block_data(0x00, 0).unwrap(), Vec::<u8>::new());
        assert_eq!(bus.smbus_read_i2c_block_data(0x00, 32).unwrap(), vec![0x5a; 32]);
        match bus.smbus_read_i2c_block_data(0x00, 33) {
            Err(Error::BlockTooLong { len: 33, max: 32 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match bus.smbus_read_i2c_block_data(0x00, 40) {
            Err(Error::BlockTooLong { len: 40, max: 32 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transfer_rejects_segments_the_kernel_cannot_take() {
        use crate::buffer::Buffer;

        let mut bus = MockI2CBus::new();
        let mut long = vec![Segment::new(0x50, MessageFlags::READ, Buffer::zeroed(70_000))];
        match bus.transfer(&mut long) {
            Err(Error::MessageTooLong {
                index: 0,
                len: 70_000,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut many: Vec<Segment> = (0..43)
            .map(|_| Segment::new(0x50, MessageFlags::empty(), buffer::encode(&[0])))
            .collect();
        match bus.transfer(&mut many) {
            Err(Error::TooManyMessages { count: 43, max: 42 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(bus.transfer_log().is_empty());
    }

    #[test]
    fn oversized_block_write_fails() {
        let mut bus = bus_at(0x50);
        match bus.smbus_write_block_data(0x00, &[0; 33]) {
            Err(Error::BlockTooLong { len: 33, max: 32 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match bus.smbus_process_block(0x00, &[0; 32]) {
            Err(Error::BlockTooLong { len: 32, max: 31 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn injected_failure_names_operation() {
        let mut bus = bus_at(0x50);
        bus.fail_next(Errno::EREMOTEIO);
        match bus.smbus_write_byte_data(0x01, 0x02) {
            Err(Error::Ioctl {
                op: "smbus_write_byte_data",
                source: Errno::EREMOTEIO,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        // one-shot
        bus.smbus_write_byte_data(0x01, 0x02).unwrap();
        assert_eq!(bus.smbus_read_byte_data(0x01).unwrap(), 0x02);
    }
}
