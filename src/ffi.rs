// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(non_camel_case_types)]

use std::convert::TryFrom;
use std::os::unix::prelude::*;
use std::ptr;

use bitflags::bitflags;
use byteorder::{ByteOrder, NativeEndian};
use nix::errno::Errno;

use crate::buffer::{Block, I2C_SMBUS_BLOCK_MAX};
use crate::transaction::Segment;

type IoctlResult<T> = Result<T, nix::Error>;

/// struct i2c_msg - an I2C transaction segment beginning with START
///
/// The kernel reads `len` bytes from, or writes `len` bytes into, `buf`.
#[repr(C)]
pub struct i2c_msg {
    /// slave address
    addr: u16,
    /// serialized MessageFlags
    flags: u16,
    /// msg length
    len: u16,
    /// pointer to msg data
    buf: *mut u8,
}

bitflags! {
    /// Adapter functionality as reported by `I2C_FUNCS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2CFunctions: u32 {
        const I2C_FUNC_I2C = 0x0000_0001;
        const I2C_FUNC_10BIT_ADDR = 0x0000_0002;
        const I2C_FUNC_PROTOCOL_MANGLING = 0x0000_0004; /* I2C_M_IGNORE_NAK etc. */
        const I2C_FUNC_SMBUS_PEC = 0x0000_0008;
        const I2C_FUNC_NOSTART = 0x0000_0010; /* I2C_M_NOSTART */
        const I2C_FUNC_SLAVE = 0x0000_0020;
        const I2C_FUNC_SMBUS_BLOCK_PROC_CALL = 0x0000_8000; /* SMBus 2.0 */
        const I2C_FUNC_SMBUS_QUICK = 0x0001_0000;
        const I2C_FUNC_SMBUS_READ_BYTE = 0x0002_0000;
        const I2C_FUNC_SMBUS_WRITE_BYTE = 0x0004_0000;
        const I2C_FUNC_SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const I2C_FUNC_SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const I2C_FUNC_SMBUS_READ_WORD_DATA = 0x0020_0000;
        const I2C_FUNC_SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const I2C_FUNC_SMBUS_PROC_CALL = 0x0080_0000;
        const I2C_FUNC_SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const I2C_FUNC_SMBUS_WRITE_BLOCK_DATA  = 0x0200_0000;
        const I2C_FUNC_SMBUS_READ_I2C_BLOCK = 0x0400_0000; /* I2C-like block xfer  */
        const I2C_FUNC_SMBUS_WRITE_I2C_BLOCK = 0x0800_0000; /* w/ 1-byte reg. addr. */

        const I2C_FUNC_SMBUS_BYTE = Self::I2C_FUNC_SMBUS_READ_BYTE.bits()
            | Self::I2C_FUNC_SMBUS_WRITE_BYTE.bits();
        const I2C_FUNC_SMBUS_BYTE_DATA = Self::I2C_FUNC_SMBUS_READ_BYTE_DATA.bits()
            | Self::I2C_FUNC_SMBUS_WRITE_BYTE_DATA.bits();
        const I2C_FUNC_SMBUS_WORD_DATA = Self::I2C_FUNC_SMBUS_READ_WORD_DATA.bits()
            | Self::I2C_FUNC_SMBUS_WRITE_WORD_DATA.bits();
        const I2C_FUNC_SMBUS_BLOCK_DATA = Self::I2C_FUNC_SMBUS_READ_BLOCK_DATA.bits()
            | Self::I2C_FUNC_SMBUS_WRITE_BLOCK_DATA.bits();
        const I2C_FUNC_SMBUS_I2C_BLOCK = Self::I2C_FUNC_SMBUS_READ_I2C_BLOCK.bits()
            | Self::I2C_FUNC_SMBUS_WRITE_I2C_BLOCK.bits();
    }
}

// In C, this is a union, but the largest item is clearly
// the largest, so a plain block covers every member.
//
// union i2c_smbus_data {
//     __u8 byte;
//     __u16 word;
//     __u8 block[I2C_SMBUS_BLOCK_MAX + 2]; /* block[0] is used for length */
//                            /* and one more for user-space compatibility */
// };
#[repr(C)]
struct i2c_smbus_data {
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

impl i2c_smbus_data {
    fn empty() -> i2c_smbus_data {
        i2c_smbus_data {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        }
    }

    fn from_block(block: &Block) -> i2c_smbus_data {
        i2c_smbus_data {
            block: block.to_prefixed(),
        }
    }

    fn from_word(value: u16) -> i2c_smbus_data {
        let mut data = i2c_smbus_data::empty();
        NativeEndian::write_u16(&mut data.block[..2], value);
        data
    }

    fn word(&self) -> u16 {
        NativeEndian::read_u16(&self.block[..2])
    }

    fn to_block(&self) -> Block {
        Block::from_prefixed(&self.block)
    }
}

#[repr(u8)]
enum I2CSMBusReadWrite {
    I2C_SMBUS_READ = 1,
    I2C_SMBUS_WRITE = 0,
}

#[repr(u32)]
#[allow(dead_code)]
enum I2CSMBusSize {
    I2C_SMBUS_QUICK = 0,
    I2C_SMBUS_BYTE = 1,
    I2C_SMBUS_BYTE_DATA = 2,
    I2C_SMBUS_WORD_DATA = 3,
    I2C_SMBUS_PROC_CALL = 4,
    I2C_SMBUS_BLOCK_DATA = 5,
    I2C_SMBUS_I2C_BLOCK_BROKEN = 6,
    I2C_SMBUS_BLOCK_PROC_CALL = 7, // SMBus 2.0
    I2C_SMBUS_I2C_BLOCK_DATA = 8,
}

// from include/uapi/linux/i2c-dev.h
const I2C_RETRIES: u16 = 0x0701;
const I2C_TIMEOUT: u16 = 0x0702;
const I2C_SLAVE: u16 = 0x0703;
const I2C_TENBIT: u16 = 0x0704;
const I2C_FUNCS: u16 = 0x0705;
const I2C_SLAVE_FORCE: u16 = 0x0706;
const I2C_RDWR: u16 = 0x0707;
const I2C_PEC: u16 = 0x0708;
const I2C_SMBUS: u16 = 0x0720;

/// This is the structure as used in the I2C_SMBUS ioctl call
#[repr(C)]
pub struct i2c_smbus_ioctl_data {
    // __u8 read_write;
    read_write: u8,
    // __u8 command;
    command: u8,
    // __u32 size;
    size: u32,
    // union i2c_smbus_data __user *data;
    data: *mut i2c_smbus_data,
}

/// This is the structure as used in the I2C_RDWR ioctl call
// see linux/i2c-dev.h
#[repr(C)]
pub struct i2c_rdwr_ioctl_data {
    // struct i2c_msg __user *msgs;
    msgs: *mut i2c_msg,
    // __u32 nmsgs;
    nmsgs: u32,
}

mod ioctl {
    pub use super::i2c_rdwr_ioctl_data;
    pub use super::i2c_smbus_ioctl_data;
    use super::{
        I2C_FUNCS, I2C_PEC, I2C_RDWR, I2C_RETRIES, I2C_SLAVE, I2C_SLAVE_FORCE, I2C_SMBUS,
        I2C_TENBIT, I2C_TIMEOUT,
    };

    nix::ioctl_write_int_bad!(set_i2c_slave_address, I2C_SLAVE);
    nix::ioctl_write_int_bad!(set_i2c_slave_address_force, I2C_SLAVE_FORCE);
    nix::ioctl_write_int_bad!(set_tenbit, I2C_TENBIT);
    nix::ioctl_write_int_bad!(set_retries, I2C_RETRIES);
    nix::ioctl_write_int_bad!(set_timeout, I2C_TIMEOUT);
    nix::ioctl_write_int_bad!(set_smbus_pec, I2C_PEC);
    nix::ioctl_read_bad!(get_funcs, I2C_FUNCS, libc::c_ulong);
    nix::ioctl_write_ptr_bad!(i2c_smbus, I2C_SMBUS, i2c_smbus_ioctl_data);
    nix::ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, i2c_rdwr_ioctl_data);
}

pub fn i2c_set_slave_address(fd: RawFd, slave_address: u16) -> IoctlResult<()> {
    unsafe {
        ioctl::set_i2c_slave_address(fd, i32::from(slave_address))?;
    }
    Ok(())
}

/// Select a slave even if a kernel driver has claimed it
///
/// # Safety
///
/// The kernel driver bound to that address keeps running; interleaving
/// with it can leave the device in an inconsistent state.
pub unsafe fn i2c_set_slave_address_force(fd: RawFd, slave_address: u16) -> IoctlResult<()> {
    ioctl::set_i2c_slave_address_force(fd, i32::from(slave_address))?;
    Ok(())
}

pub fn i2c_set_tenbit(fd: RawFd, enable: bool) -> IoctlResult<()> {
    unsafe {
        ioctl::set_tenbit(fd, i32::from(enable))?;
    }
    Ok(())
}

pub fn i2c_set_retries(fd: RawFd, retries: u32) -> IoctlResult<()> {
    let retries = i32::try_from(retries).unwrap_or(i32::max_value());
    unsafe {
        ioctl::set_retries(fd, retries)?;
    }
    Ok(())
}

/// Timeout in units of 10 ms (jiffies at HZ=100, as the ABI defines it)
pub fn i2c_set_timeout(fd: RawFd, ticks: u32) -> IoctlResult<()> {
    let ticks = i32::try_from(ticks).unwrap_or(i32::max_value());
    unsafe {
        ioctl::set_timeout(fd, ticks)?;
    }
    Ok(())
}

pub fn i2c_set_smbus_pec(fd: RawFd, enable: bool) -> IoctlResult<()> {
    unsafe {
        ioctl::set_smbus_pec(fd, i32::from(enable))?;
    }
    Ok(())
}

pub fn i2c_get_functionality(fd: RawFd) -> IoctlResult<I2CFunctions> {
    let mut funcs: libc::c_ulong = 0;
    unsafe {
        ioctl::get_funcs(fd, &mut funcs)?;
    }
    Ok(I2CFunctions::from_bits_truncate(funcs as u32))
}

unsafe fn i2c_smbus_access(
    fd: RawFd,
    read_write: I2CSMBusReadWrite,
    command: u8, // can be address or something else
    size: I2CSMBusSize,
    data: *mut i2c_smbus_data,
) -> IoctlResult<()> {
    let args = i2c_smbus_ioctl_data {
        read_write: read_write as u8,
        command,
        size: size as u32,
        data,
    };

    ioctl::i2c_smbus(fd, &args).map(drop)
}

#[inline]
pub fn i2c_smbus_write_quick(fd: RawFd, bit: bool) -> IoctlResult<()> {
    let read_write = if bit {
        I2CSMBusReadWrite::I2C_SMBUS_READ
    } else {
        I2CSMBusReadWrite::I2C_SMBUS_WRITE
    };
    unsafe {
        i2c_smbus_access(
            fd,
            read_write,
            0,
            I2CSMBusSize::I2C_SMBUS_QUICK,
            ptr::null_mut(),
        )
    }
}

#[inline]
pub fn i2c_smbus_read_byte(fd: RawFd) -> IoctlResult<u8> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            0,
            I2CSMBusSize::I2C_SMBUS_BYTE,
            &mut data,
        )?
    }
    Ok(data.block[0])
}

#[inline]
pub fn i2c_smbus_write_byte(fd: RawFd, value: u8) -> IoctlResult<()> {
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            value,
            I2CSMBusSize::I2C_SMBUS_BYTE,
            ptr::null_mut(),
        )
    }
}

#[inline]
pub fn i2c_smbus_read_byte_data(fd: RawFd, register: u8) -> IoctlResult<u8> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            register,
            I2CSMBusSize::I2C_SMBUS_BYTE_DATA,
            &mut data,
        )?;
    }
    Ok(data.block[0])
}

#[inline]
pub fn i2c_smbus_write_byte_data(fd: RawFd, register: u8, value: u8) -> IoctlResult<()> {
    let mut data = i2c_smbus_data::empty();
    data.block[0] = value;
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_BYTE_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_read_word_data(fd: RawFd, register: u8) -> IoctlResult<u16> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            register,
            I2CSMBusSize::I2C_SMBUS_WORD_DATA,
            &mut data,
        )?;
    };
    Ok(data.word())
}

#[inline]
pub fn i2c_smbus_write_word_data(fd: RawFd, register: u8, value: u16) -> IoctlResult<()> {
    let mut data = i2c_smbus_data::from_word(value);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_WORD_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_process_call(fd: RawFd, register: u8, value: u16) -> IoctlResult<u16> {
    let mut data = i2c_smbus_data::from_word(value);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_PROC_CALL,
            &mut data,
        )?;
    }
    Ok(data.word())
}

#[inline]
pub fn i2c_smbus_read_block_data(fd: RawFd, register: u8) -> IoctlResult<Block> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            register,
            I2CSMBusSize::I2C_SMBUS_BLOCK_DATA,
            &mut data,
        )?;
    }
    Ok(data.to_block())
}

/// Read `len` bytes; the kernel takes the length from `block[0]`
///
/// `len` must be 1 to 32; the kernel answers `EINVAL` otherwise.
pub fn i2c_smbus_read_i2c_block_data(fd: RawFd, register: u8, len: u8) -> IoctlResult<Block> {
    let mut data = i2c_smbus_data::empty();
    data.block[0] = len;
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            register,
            I2CSMBusSize::I2C_SMBUS_I2C_BLOCK_DATA,
            &mut data,
        )?;
    }
    Ok(data.to_block())
}

#[inline]
pub fn i2c_smbus_write_block_data(fd: RawFd, register: u8, block: &Block) -> IoctlResult<()> {
    let mut data = i2c_smbus_data::from_block(block);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_BLOCK_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_write_i2c_block_data(
    fd: RawFd,
    register: u8,
    block: &Block,
) -> IoctlResult<()> {
    let mut data = i2c_smbus_data::from_block(block);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_I2C_BLOCK_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_process_call_block(
    fd: RawFd,
    register: u8,
    block: &Block,
) -> IoctlResult<Block> {
    let mut data = i2c_smbus_data::from_block(block);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            register,
            I2CSMBusSize::I2C_SMBUS_BLOCK_PROC_CALL,
            &mut data,
        )?;
    };
    Ok(data.to_block())
}

/// Issue one `I2C_RDWR` call covering every segment
///
/// A segment whose length does not fit the 16-bit `len` field fails with
/// `EINVAL` before anything reaches the kernel.
pub fn i2c_rdwr(fd: RawFd, segments: &mut [Segment]) -> IoctlResult<u32> {
    let mut msgs = segments
        .iter_mut()
        .map(|segment| -> IoctlResult<i2c_msg> {
            let len = u16::try_from(segment.buffer().capacity()).map_err(|_| Errno::EINVAL)?;
            Ok(i2c_msg {
                addr: segment.address(),
                flags: segment.flags().bits(),
                len,
                buf: segment.buffer_mut().as_mut_ptr(),
            })
        })
        .collect::<IoctlResult<Vec<i2c_msg>>>()?;
    let i2c_data = i2c_rdwr_ioctl_data {
        msgs: msgs.as_mut_ptr(),
        nmsgs: msgs.len() as u32,
    };

    let n = unsafe { ioctl::i2c_rdwr(fd, &i2c_data)? };
    Ok(n as u32)
}
