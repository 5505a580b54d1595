// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::{File, OpenOptions};
use std::io;
use std::io::prelude::*;
use std::os::unix::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::buffer::{self, Block, I2C_SMBUS_BLOCK_MAX};
use crate::config::BusConfig;
use crate::core::{I2CBus, I2CTransfer};
use crate::error::{Error, Result};
use crate::ffi::{self, I2CFunctions};
use crate::transaction::{self, Segment};

/// Concrete linux I2C bus
///
/// A single bus may have multiple devices on it.  The kernel exposes one
/// device node (e.g. `/dev/i2c-1`) per I2C bus that the system has access
/// to (and which is exposed to userspace).
///
/// Single operations go to the slave selected with `set_slave_address`;
/// transactions carry their own addresses.  The handle is not internally
/// synchronized: share it between threads behind a `Mutex`.
pub struct LinuxI2CBus {
    devfile: Option<File>,
    path: PathBuf,
    slave_address: Option<u16>,
    ten_bit_addressing: bool,
    retries: Option<u32>,
    timeout: Option<Duration>,
}

/// Device node of bus number `index`
pub fn bus_path(index: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{}", index))
}

/// `I2C_TIMEOUT` counts in units of 10 ms; round up so short timeouts
/// never become "no timeout"
fn timeout_ticks(timeout: Duration) -> u32 {
    let ms = timeout.as_millis();
    let ticks = (ms + 9) / 10;
    if ticks > u128::from(u32::max_value()) {
        u32::max_value()
    } else {
        ticks as u32
    }
}

/// i2c-dev moves a whole message per call, so a partial count means the
/// adapter gave up part way
fn check_count(op: &'static str, n: usize, expected: usize, kind: io::ErrorKind) -> Result<()> {
    if n == expected {
        return Ok(());
    }
    Err(Error::Io {
        op,
        source: io::Error::new(
            kind,
            format!("transferred {} of {} bytes", n, expected),
        ),
    })
}

impl LinuxI2CBus {
    /// Open the bus at `path` for reading and writing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LinuxI2CBus> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("opened {}", path.display());
        Ok(LinuxI2CBus {
            devfile: Some(file),
            path: path.to_path_buf(),
            slave_address: None,
            ten_bit_addressing: false,
            retries: None,
            timeout: None,
        })
    }

    /// Open `/dev/i2c-<index>`
    pub fn open_index(index: u32) -> Result<LinuxI2CBus> {
        LinuxI2CBus::open(bus_path(index))
    }

    /// Open the bus at `path` and apply `config`
    pub fn open_with<P: AsRef<Path>>(path: P, config: &BusConfig) -> Result<LinuxI2CBus> {
        let mut bus = LinuxI2CBus::open(path)?;
        config.apply(&mut bus)?;
        Ok(bus)
    }

    /// Release the device node
    ///
    /// Closing twice is harmless; every other operation on a closed bus
    /// fails with `Error::Closed`.
    pub fn close(&mut self) {
        if self.devfile.take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.devfile.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ten_bit_addressing(&self) -> bool {
        self.ten_bit_addressing
    }

    pub fn retries(&self) -> Option<u32> {
        self.retries
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Descriptor of the open device node
    pub fn raw_fd(&self) -> Result<RawFd> {
        self.fd("raw_fd")
    }

    fn fd(&self, op: &'static str) -> Result<RawFd> {
        self.devfile
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or(Error::Closed { op })
    }

    fn file(&mut self, op: &'static str) -> Result<&mut File> {
        self.devfile.as_mut().ok_or(Error::Closed { op })
    }

    /// Select a slave even if a kernel driver is bound to it
    ///
    /// # Safety
    ///
    /// The kernel driver keeps talking to the device too; using this while
    /// it does can corrupt the device state.
    pub unsafe fn set_slave_address_force(&mut self, slave_address: u16) -> Result<()> {
        let fd = self.fd("set_slave_address_force")?;
        ffi::i2c_set_slave_address_force(fd, slave_address)
            .map_err(Error::ioctl("set_slave_address_force"))?;
        debug!("{}: forced slave 0x{:02x}", self.path.display(), slave_address);
        self.slave_address = Some(slave_address);
        Ok(())
    }

    /// Enable or disable SMBus packet error checking for single operations
    pub fn set_smbus_pec(&mut self, enable: bool) -> Result<()> {
        let fd = self.fd("set_smbus_pec")?;
        ffi::i2c_set_smbus_pec(fd, enable).map_err(Error::ioctl("set_smbus_pec"))
    }

    /// Query what the adapter behind this bus supports
    pub fn functionality(&self) -> Result<I2CFunctions> {
        let fd = self.fd("functionality")?;
        ffi::i2c_get_functionality(fd).map_err(Error::ioctl("functionality"))
    }
}

impl I2CBus for LinuxI2CBus {
    fn slave_address(&self) -> Option<u16> {
        self.slave_address
    }

    /// Typically the address is expected to be 7-bits but 10-bit addresses
    /// may be supported by the kernel driver in some cases.  Little validation
    /// is done in Rust as the kernel is good at making sure things are valid.
    fn set_slave_address(&mut self, slave_address: u16) -> Result<()> {
        let fd = self.fd("set_slave_address")?;
        ffi::i2c_set_slave_address(fd, slave_address).map_err(Error::ioctl("set_slave_address"))?;
        debug!("{}: slave 0x{:02x}", self.path.display(), slave_address);
        self.slave_address = Some(slave_address);
        Ok(())
    }

    fn set_ten_bit_addressing(&mut self, enable: bool) -> Result<()> {
        let fd = self.fd("set_ten_bit_addressing")?;
        ffi::i2c_set_tenbit(fd, enable).map_err(Error::ioctl("set_ten_bit_addressing"))?;
        self.ten_bit_addressing = enable;
        Ok(())
    }

    fn set_retries(&mut self, retries: u32) -> Result<()> {
        let fd = self.fd("set_retries")?;
        ffi::i2c_set_retries(fd, retries).map_err(Error::ioctl("set_retries"))?;
        self.retries = Some(retries);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let fd = self.fd("set_timeout")?;
        ffi::i2c_set_timeout(fd, timeout_ticks(timeout)).map_err(Error::ioctl("set_timeout"))?;
        self.timeout = Some(timeout);
        Ok(())
    }

    /// One read(2) of `data.len()` bytes; a short read is an `Io` error
    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        let n = self.file("read")?.read(data).map_err(Error::io("read"))?;
        check_count("read", n, data.len(), io::ErrorKind::UnexpectedEof)
    }

    /// One write(2) of `data`; a short write is an `Io` error
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let n = self.file("write")?.write(data).map_err(Error::io("write"))?;
        check_count("write", n, data.len(), io::ErrorKind::WriteZero)
    }

    fn smbus_write_quick(&mut self, bit: bool) -> Result<()> {
        let fd = self.fd("smbus_write_quick")?;
        ffi::i2c_smbus_write_quick(fd, bit).map_err(Error::ioctl("smbus_write_quick"))
    }

    fn smbus_read_byte(&mut self) -> Result<u8> {
        let fd = self.fd("smbus_read_byte")?;
        ffi::i2c_smbus_read_byte(fd).map_err(Error::ioctl("smbus_read_byte"))
    }

    fn smbus_write_byte(&mut self, value: u8) -> Result<()> {
        let fd = self.fd("smbus_write_byte")?;
        ffi::i2c_smbus_write_byte(fd, value).map_err(Error::ioctl("smbus_write_byte"))
    }

    fn smbus_read_byte_data(&mut self, register: u8) -> Result<u8> {
        let fd = self.fd("smbus_read_byte_data")?;
        ffi::i2c_smbus_read_byte_data(fd, register).map_err(Error::ioctl("smbus_read_byte_data"))
    }

    fn smbus_write_byte_data(&mut self, register: u8, value: u8) -> Result<()> {
        let fd = self.fd("smbus_write_byte_data")?;
        ffi::i2c_smbus_write_byte_data(fd, register, value)
            .map_err(Error::ioctl("smbus_write_byte_data"))
    }

    fn smbus_read_word_data(&mut self, register: u8) -> Result<u16> {
        let fd = self.fd("smbus_read_word_data")?;
        ffi::i2c_smbus_read_word_data(fd, register).map_err(Error::ioctl("smbus_read_word_data"))
    }

    fn smbus_write_word_data(&mut self, register: u8, value: u16) -> Result<()> {
        let fd = self.fd("smbus_write_word_data")?;
        ffi::i2c_smbus_write_word_data(fd, register, value)
            .map_err(Error::ioctl("smbus_write_word_data"))
    }

    fn smbus_process_word(&mut self, register: u8, value: u16) -> Result<u16> {
        let fd = self.fd("smbus_process_word")?;
        ffi::i2c_smbus_process_call(fd, register, value).map_err(Error::ioctl("smbus_process_word"))
    }

    fn smbus_read_block_data(&mut self, register: u8) -> Result<Vec<u8>> {
        let fd = self.fd("smbus_read_block_data")?;
        let block = ffi::i2c_smbus_read_block_data(fd, register)
            .map_err(Error::ioctl("smbus_read_block_data"))?;
        Ok(block.to_vec())
    }

    fn smbus_read_i2c_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>> {
        let fd = self.fd("smbus_read_i2c_block_data")?;
        if buffer::i2c_block_read_len(len)? == 0 {
            return Ok(Vec::new());
        }
        let block = ffi::i2c_smbus_read_i2c_block_data(fd, register, len)
            .map_err(Error::ioctl("smbus_read_i2c_block_data"))?;
        Ok(block.to_vec())
    }

    fn smbus_write_block_data(&mut self, register: u8, values: &[u8]) -> Result<()> {
        let fd = self.fd("smbus_write_block_data")?;
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX)?;
        ffi::i2c_smbus_write_block_data(fd, register, &block)
            .map_err(Error::ioctl("smbus_write_block_data"))
    }

    fn smbus_write_i2c_block_data(&mut self, register: u8, values: &[u8]) -> Result<()> {
        let fd = self.fd("smbus_write_i2c_block_data")?;
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX)?;
        ffi::i2c_smbus_write_i2c_block_data(fd, register, &block)
            .map_err(Error::ioctl("smbus_write_i2c_block_data"))
    }

    fn smbus_process_block(&mut self, register: u8, values: &[u8]) -> Result<Vec<u8>> {
        let fd = self.fd("smbus_process_block")?;
        let block = Block::new(values, I2C_SMBUS_BLOCK_MAX - 1)?;
        let reply = ffi::i2c_smbus_process_call_block(fd, register, &block)
            .map_err(Error::ioctl("smbus_process_block"))?;
        Ok(reply.to_vec())
    }
}

impl I2CTransfer for LinuxI2CBus {
    /// Issue the whole segment array as one `I2C_RDWR` ioctl
    fn transfer(&mut self, segments: &mut [Segment]) -> Result<u32> {
        let fd = self.fd("transfer")?;
        transaction::check_segments(segments)?;
        ffi::i2c_rdwr(fd, segments).map_err(Error::ioctl("transfer"))
    }
}
