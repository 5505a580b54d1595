// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

// Drives the public API against the in-memory bus

use std::time::Duration;

use i2cbus::core::{I2CBus, I2CTransfer};
use i2cbus::mock::MockI2CBus;
use i2cbus::{BusConfig, Error, Message, MessageFlags, Tag, Transaction};

const SENSOR: u16 = 0x42;
const EEPROM: u16 = 0x50;

fn populated_bus() -> MockI2CBus {
    let mut bus = MockI2CBus::new();
    bus.device(SENSOR).write_regs(0x18, &[0x11, 0x22, 0x33]);
    bus.device(EEPROM).write_regs(0x00, b"serial-0042");
    bus
}

#[test]
fn register_read_in_one_transfer() {
    let mut bus = populated_bus();
    let results = bus
        .transaction(vec![
            Message::write(vec![0x18]).with_address(SENSOR),
            Message::read(3).with_address(SENSOR).with_tag("x"),
        ])
        .unwrap();

    assert_eq!(bus.transfer_log().len(), 1);
    assert_eq!(results.len(), 1);
    assert_eq!(results[&Tag::from("x")], vec![0x11, 0x22, 0x33]);
}

#[test]
fn two_devices_in_one_transaction() {
    let mut bus = populated_bus();
    let results = Transaction::new()
        .message(Message::write(vec![0x18]).with_address(SENSOR))
        .message(Message::read(1).with_address(SENSOR).with_tag("status"))
        .message(Message::write(vec![0x00]).with_address(EEPROM))
        .message(Message::read(6).with_address(EEPROM).with_tag("serial"))
        .execute(&mut bus)
        .unwrap();

    assert_eq!(results[&Tag::from("status")], vec![0x11]);
    assert_eq!(results[&Tag::from("serial")], b"serial".to_vec());

    let addresses: Vec<u16> = bus.transfer_log()[0].iter().map(|s| s.address).collect();
    assert_eq!(addresses, vec![SENSOR, SENSOR, EEPROM, EEPROM]);
}

#[test]
fn write_only_transaction_returns_nothing() {
    let mut bus = populated_bus();
    let results = bus
        .transaction(vec![Message::write(vec![0x18, 0xaa]).with_address(SENSOR)])
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(bus.device(SENSOR).read_regs(0x18, 1), vec![0xaa]);
}

#[test]
fn selected_slave_and_transactions_do_not_interfere() {
    let mut bus = populated_bus();
    BusConfig::new()
        .slave_address(EEPROM)
        .retries(2)
        .timeout(Duration::from_millis(100))
        .apply(&mut bus)
        .unwrap();

    bus.transaction(vec![Message::write(vec![0x18, 0x99]).with_address(SENSOR)])
        .unwrap();

    assert_eq!(bus.slave_address(), Some(EEPROM));
    assert_eq!(bus.smbus_read_byte_data(0x00).unwrap(), b's');
    assert_eq!(bus.device(SENSOR).read_regs(0x18, 1), vec![0x99]);
}

#[test]
fn protocol_options_reach_the_kernel_flags() {
    let mut bus = populated_bus();
    bus.transaction(vec![
        Message::write(vec![0x18]).with_address(SENSOR).ignore_nak(),
        Message::read(2)
            .with_address(SENSOR)
            .no_start()
            .no_read_ack()
            .revise_rw_bit(),
    ])
    .unwrap();

    let log = &bus.transfer_log()[0];
    assert_eq!(log[0].flags, MessageFlags::IGNORE_NAK);
    assert_eq!(
        log[1].flags,
        MessageFlags::READ
            | MessageFlags::NO_START
            | MessageFlags::NO_READ_ACK
            | MessageFlags::REVISE_RW_BIT
    );
}

#[test]
fn empty_transaction_is_rejected() {
    let mut bus = populated_bus();
    match Transaction::new().execute(&mut bus) {
        Err(Error::EmptyTransaction) => {}
        other => panic!("unexpected {:?}", other),
    }
}
