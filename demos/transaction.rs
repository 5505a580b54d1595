// Copyright 2018, Piers Finlayson <piers@piersandkatie.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

// Reads a run of registers from any device with an auto-incrementing
// register pointer, using a single combined transfer.

#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cbus::core::I2CTransfer;
#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cbus::linux::LinuxI2CBus;
#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cbus::{BusConfig, Message, Tag};

use docopt::Docopt;
use std::env::args;

const USAGE: &str = "
Reads registers via a write/read transaction on Linux i2c-dev.

Usage:
  transaction [--retries=<n>] <device> <address> <register> <count>
  transaction (-h | --help)
  transaction --version

Options:
  -h --help       Show this help text.
  --version       Show version.
  --retries=<n>   Adapter retry count.
";

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn parse_int(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() {
    env_logger::init();

    let args = Docopt::new(USAGE)
        .and_then(|d| d.argv(args()).parse())
        .unwrap_or_else(|e| e.exit());
    let path = args.get_str("<device>");
    let (address, register, count) = match (
        parse_int(args.get_str("<address>")),
        parse_int(args.get_str("<register>")),
        parse_int(args.get_str("<count>")),
    ) {
        (Some(a), Some(r), Some(c)) if a <= 0x3ff && r <= 0xff => (a as u16, r as u8, c as usize),
        _ => {
            println!("address, register and count must be integers");
            return;
        }
    };

    let mut config = BusConfig::new();
    if let Some(retries) = parse_int(args.get_str("--retries")) {
        config = config.retries(retries);
    }

    let mut bus = match LinuxI2CBus::open_with(path, &config) {
        Ok(bus) => bus,
        Err(e) => {
            println!("Error opening I2C Bus {} {}", path, e);
            return;
        }
    };
    println!("Opened I2C Bus OK: {}", path);

    let results = match bus.transaction(vec![
        Message::write(vec![register]).with_address(address),
        Message::read(count).with_address(address).with_tag("data"),
    ]) {
        Ok(results) => results,
        Err(e) => {
            println!("Error reading/writing {}", e);
            return;
        }
    };

    let mut output = "Result: 0x".to_string();
    for byte in &results[&Tag::from("data")] {
        output = format!("{}{:02x}", output, byte);
    }
    println!("{}", output);
}
