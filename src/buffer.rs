// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Fixed-capacity byte regions handed to the kernel
//!
//! A `Buffer` backs one `i2c_msg` in a transaction; a `Block` backs the
//! data area of an SMBus block transfer.

use crate::error::{Error, Result};

/// As specified in SMBus standard
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

/// Raw byte region sized exactly to one message
///
/// The capacity is fixed at creation; the kernel reads from or writes into
/// indices `0..capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    bytes: Box<[u8]>,
}

impl Buffer {
    /// Zero-filled buffer for a read of `len` bytes
    pub fn zeroed(len: usize) -> Buffer {
        Buffer {
            bytes: vec![0; len].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    /// Copy out the first `len` bytes
    pub fn decode(&self, len: usize) -> Result<Vec<u8>> {
        if len > self.capacity() {
            return Err(Error::LengthMismatch {
                requested: len,
                capacity: self.capacity(),
            });
        }
        Ok(self.bytes[..len].to_vec())
    }
}

/// Allocate a buffer holding exactly `values`
pub fn encode(values: &[u8]) -> Buffer {
    Buffer {
        bytes: values.into(),
    }
}

/// Read exactly `len` bytes from the start of `buffer`
pub fn decode(buffer: &Buffer, len: usize) -> Result<Vec<u8>> {
    buffer.decode(len)
}

/// Check the length of an i2c-block read against the SMBus limit
///
/// Zero is accepted; callers return an empty vector for it without
/// touching the bus.
pub(crate) fn i2c_block_read_len(len: u8) -> Result<usize> {
    let len = usize::from(len);
    if len > I2C_SMBUS_BLOCK_MAX {
        return Err(Error::BlockTooLong {
            len,
            max: I2C_SMBUS_BLOCK_MAX,
        });
    }
    Ok(len)
}

/// Payload of an SMBus block transfer, at most 32 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    len: u8,
    data: [u8; I2C_SMBUS_BLOCK_MAX],
}

impl Block {
    /// Build a block from `values`, refusing anything longer than `max`
    ///
    /// `max` is 32 for block and i2c-block writes and 31 for the block
    /// process call.
    pub fn new(values: &[u8], max: usize) -> Result<Block> {
        let max = max.min(I2C_SMBUS_BLOCK_MAX);
        if values.len() > max {
            return Err(Error::BlockTooLong {
                len: values.len(),
                max,
            });
        }
        let mut data = [0; I2C_SMBUS_BLOCK_MAX];
        data[..values.len()].copy_from_slice(values);
        Ok(Block {
            len: values.len() as u8,
            data,
        })
    }

    /// Decode the kernel's length-prefixed representation
    ///
    /// `raw[0]` holds the count; it is clamped to the SMBus limit so a
    /// misbehaving driver can never make us read past the block.
    pub fn from_prefixed(raw: &[u8]) -> Block {
        let count = raw
            .first()
            .map_or(0, |&c| usize::from(c))
            .min(I2C_SMBUS_BLOCK_MAX)
            .min(raw.len().saturating_sub(1));
        let mut data = [0; I2C_SMBUS_BLOCK_MAX];
        if let Some(values) = raw.get(1..=count) {
            data[..count].copy_from_slice(values);
        }
        Block {
            len: count as u8,
            data,
        }
    }

    /// Write the length-prefixed representation into `raw`
    ///
    /// `raw` must hold the count byte plus `len()` data bytes.
    pub fn write_prefixed(&self, raw: &mut [u8]) -> Result<()> {
        let len = self.len();
        match raw.get_mut(..=len) {
            Some(dest) => {
                dest[0] = self.len;
                dest[1..].copy_from_slice(self.as_slice());
                Ok(())
            }
            None => Err(Error::LengthMismatch {
                requested: len + 1,
                capacity: raw.len(),
            }),
        }
    }

    /// Length-prefixed representation in the kernel's `i2c_smbus_data` layout
    pub fn to_prefixed(&self) -> [u8; I2C_SMBUS_BLOCK_MAX + 2] {
        let mut raw = [0; I2C_SMBUS_BLOCK_MAX + 2];
        raw[0] = self.len;
        raw[1..=self.len()].copy_from_slice(self.as_slice());
        raw
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}
