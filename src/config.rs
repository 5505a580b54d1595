// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::Duration;

use log::debug;

use crate::core::I2CBus;
use crate::error::Result;

/// Bus-wide settings applied right after a bus is opened
///
/// Unset fields leave the kernel defaults alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusConfig {
    pub slave_address: Option<u16>,
    pub ten_bit_addressing: bool,
    pub retries: Option<u32>,
    pub timeout: Option<Duration>,
}

impl BusConfig {
    pub fn new() -> BusConfig {
        BusConfig::default()
    }

    pub fn slave_address(mut self, slave_address: u16) -> BusConfig {
        self.slave_address = Some(slave_address);
        self
    }

    pub fn ten_bit_addressing(mut self, enable: bool) -> BusConfig {
        self.ten_bit_addressing = enable;
        self
    }

    pub fn retries(mut self, retries: u32) -> BusConfig {
        self.retries = Some(retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> BusConfig {
        self.timeout = Some(timeout);
        self
    }

    /// Push these settings to `bus`
    ///
    /// The addressing mode goes first since the kernel validates the slave
    /// address against it.  The first failure stops the sequence.
    pub fn apply<B: I2CBus + ?Sized>(&self, bus: &mut B) -> Result<()> {
        debug!("applying {:?}", self);
        if self.ten_bit_addressing {
            bus.set_ten_bit_addressing(true)?;
        }
        if let Some(address) = self.slave_address {
            bus.set_slave_address(address)?;
        }
        if let Some(retries) = self.retries {
            bus.set_retries(retries)?;
        }
        if let Some(timeout) = self.timeout {
            bus.set_timeout(timeout)?;
        }
        Ok(())
    }
}
