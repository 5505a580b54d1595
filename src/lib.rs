// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! # i2cbus
//!
//! The `i2cbus` crate provides a safe interface to I2C buses under Linux.
//! The API wraps the Linux kernel interface for interacting with i2c in
//! userspace: <https://www.kernel.org/doc/Documentation/i2c/dev-interface>
//!
//! A `LinuxI2CBus` offers the single SMBus operations of `I2CBus` on the
//! currently selected slave, and multi-message transactions through
//! `I2CTransfer`:
//!
//! ```no_run
//! use i2cbus::core::{I2CBus, I2CTransfer};
//! use i2cbus::linux::LinuxI2CBus;
//! use i2cbus::{Message, Tag};
//!
//! # fn main() -> i2cbus::Result<()> {
//! let mut bus = LinuxI2CBus::open("/dev/i2c-1")?;
//!
//! bus.set_slave_address(0x48)?;
//! let config = bus.smbus_read_word_data(0x01)?;
//!
//! let results = bus.transaction(vec![
//!     Message::write(vec![0x00]).with_address(0x50),
//!     Message::read(16).with_address(0x50).with_tag("eeprom"),
//! ])?;
//! println!("{:04x} {:?}", config, results[&Tag::from("eeprom")]);
//! # Ok(())
//! # }
//! ```

#![crate_name = "i2cbus"]
#![crate_type = "lib"]

pub mod buffer;
pub mod config;
pub mod core;
mod error;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod ffi;
pub mod flags;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;
pub mod message;
pub mod mock;
pub mod transaction;

pub use crate::buffer::{Block, Buffer};
pub use crate::config::BusConfig;
pub use crate::error::{Error, Result};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use crate::ffi::I2CFunctions;
pub use crate::flags::{MessageFlags, MessageOptions, DEFAULT_SLAVE_ADDRESS};
pub use crate::message::{Direction, Message, Tag};
pub use crate::transaction::{execute, Segment, Transaction};
