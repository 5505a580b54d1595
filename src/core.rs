// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::message::{Message, Tag};
use crate::transaction::{self, Segment};

/// Interface to an I2C bus from the master side
///
/// Single operations address the slave selected with
/// `set_slave_address`.  Typical implementations will store that
/// selection on the handle.  The trait is based on the Linux i2cdev
/// interface.
pub trait I2CBus {
    /// Slave currently selected for single operations, if any
    fn slave_address(&self) -> Option<u16>;

    /// Select the slave that subsequent single operations address
    fn set_slave_address(&mut self, slave_address: u16) -> Result<()>;

    /// Switch the bus between 7-bit and 10-bit slave addresses
    fn set_ten_bit_addressing(&mut self, enable: bool) -> Result<()>;

    /// Number of times the adapter retries when the slave does not answer
    fn set_retries(&mut self, retries: u32) -> Result<()>;

    /// How long the adapter waits for the slave
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Read data from the device to fill the provided slice
    fn read(&mut self, data: &mut [u8]) -> Result<()>;

    /// Write the provided buffer to the device
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// This sends a single bit to the device, at the place of the Rd/Wr bit
    fn smbus_write_quick(&mut self, bit: bool) -> Result<()>;

    /// Read a single byte from a device, without specifying a device register
    ///
    /// Some devices are so simple that this interface is enough; for
    /// others, it is a shorthand if you want to read the same register as in
    /// the previous SMBus command.
    fn smbus_read_byte(&mut self) -> Result<u8>;

    /// Write a single byte to a device, without specifying a device register
    ///
    /// This is the opposite operation as smbus_read_byte.  As with read_byte,
    /// no register is specified.
    fn smbus_write_byte(&mut self, value: u8) -> Result<()>;

    /// Read a single byte from a device, from a designated register
    ///
    /// The register is specified through the Comm byte.
    fn smbus_read_byte_data(&mut self, register: u8) -> Result<u8>;

    /// Write a single byte to a specific register on a device
    ///
    /// The register is specified through the Comm byte.
    fn smbus_write_byte_data(&mut self, register: u8, value: u8) -> Result<()>;

    /// Read 2 bytes from a given register on a device
    fn smbus_read_word_data(&mut self, register: u8) -> Result<u16>;

    /// Write 2 bytes to a given register on a device
    fn smbus_write_word_data(&mut self, register: u8, value: u16) -> Result<()>;

    /// Select a register, send 16 bits of data to it, and read 16 bits of data
    fn smbus_process_word(&mut self, register: u8, value: u16) -> Result<u16>;

    /// Read a block of up to 32 bytes from a device
    ///
    /// The actual number of bytes available to read is returned in the count
    /// byte.  This code returns a correctly sized vector containing the
    /// count bytes read from the device.
    fn smbus_read_block_data(&mut self, register: u8) -> Result<Vec<u8>>;

    /// Read exactly `len` bytes starting at `register`
    ///
    /// Unlike `smbus_read_block_data` no count byte is exchanged.  A `len`
    /// above 32 fails with `Error::BlockTooLong`; a `len` of 0 returns an
    /// empty vector without touching the bus.
    fn smbus_read_i2c_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>>;

    /// Write a block of up to 32 bytes to a device
    ///
    /// The opposite of the Block Read command, this writes up to 32 bytes to
    /// a device, to a designated register that is specified through the
    /// Comm byte. The amount of data is specified in the Count byte.
    fn smbus_write_block_data(&mut self, register: u8, values: &[u8]) -> Result<()>;

    /// Write up to 32 bytes starting at `register`, without a count byte
    fn smbus_write_i2c_block_data(&mut self, register: u8, values: &[u8]) -> Result<()>;

    /// Select a register, send 1 to 31 bytes of data to it, and reads
    /// 1 to 31 bytes of data from it.
    fn smbus_process_block(&mut self, register: u8, values: &[u8]) -> Result<Vec<u8>>;
}

/// Bus that can run several messages as one combined transfer
///
/// Backed by the `I2C_RDWR` ioctl on Linux: all segments run in order
/// with repeated STARTs and a single STOP at the end.  Not every adapter
/// supports more than one segment per transfer.
pub trait I2CTransfer {
    /// Run all `segments` in one kernel call
    ///
    /// Returns the number of segments the adapter reports as processed.
    /// Read segments have their buffers filled in place.
    fn transfer(&mut self, segments: &mut [Segment]) -> Result<u32>;

    /// Build and run a transaction from `messages`
    ///
    /// See `transaction::execute`.
    fn transaction(&mut self, messages: Vec<Message>) -> Result<HashMap<Tag, Vec<u8>>>
    where
        Self: Sized,
    {
        transaction::execute(self, messages)
    }
}
