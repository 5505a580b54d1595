// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Multi-message transactions
//!
//! A transaction is an ordered list of `Message`s submitted to the kernel
//! in a single `I2C_RDWR` call.  The bytes read by each read message come
//! back keyed by its `Tag`:
//!
//! ```no_run
//! use i2cbus::linux::LinuxI2CBus;
//! use i2cbus::{Message, Tag, Transaction};
//!
//! # fn main() -> i2cbus::Result<()> {
//! let mut bus = LinuxI2CBus::open_index(1)?;
//! let results = Transaction::new()
//!     .message(Message::write(vec![0x18, 1, 2, 3]).with_address(0x42))
//!     .message(Message::read(3).with_address(0x42).with_tag("x"))
//!     .execute(&mut bus)?;
//! println!("{:?}", results[&Tag::from("x")]);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::iter::FromIterator;

use log::{debug, trace};

use crate::buffer::{self, Buffer};
use crate::core::I2CTransfer;
use crate::error::{Error, Result};
use crate::flags::MessageFlags;
use crate::message::{Direction, Message, Tag};

/// Most messages the kernel accepts in one `I2C_RDWR` call
pub const I2C_RDWR_IOCTL_MAX_MSGS: usize = 42;

/// One slot of the kernel argument array
///
/// Mirrors `struct i2c_msg`, owning the data buffer the kernel reads from
/// or writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    address: u16,
    flags: MessageFlags,
    buffer: Buffer,
}

impl Segment {
    pub fn new(address: u16, flags: MessageFlags, buffer: Buffer) -> Segment {
        Segment {
            address,
            flags,
            buffer,
        }
    }

    fn from_message(message: &Message) -> Segment {
        let buffer = match *message.direction() {
            Direction::Read(len) => Buffer::zeroed(len),
            Direction::Write(ref data) => buffer::encode(data),
        };
        Segment::new(message.address(), message.flags(), buffer)
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn flags(&self) -> MessageFlags {
        self.flags
    }

    pub fn is_read(&self) -> bool {
        self.flags.contains(MessageFlags::READ)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }
}

/// Ordered list of messages run as one kernel operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    messages: Vec<Message>,
}

impl Transaction {
    pub fn new() -> Transaction {
        Transaction::default()
    }

    /// Append `message`, builder style
    pub fn message(mut self, message: Message) -> Transaction {
        self.messages.push(message);
        self
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Run the transaction on `bus`; see `execute`
    pub fn execute<B: I2CTransfer + ?Sized>(self, bus: &mut B) -> Result<HashMap<Tag, Vec<u8>>> {
        execute(bus, self.messages)
    }
}

impl From<Vec<Message>> for Transaction {
    fn from(messages: Vec<Message>) -> Transaction {
        Transaction { messages }
    }
}

impl FromIterator<Message> for Transaction {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Transaction {
        Transaction {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Check a raw segment array against the `I2C_RDWR` limits
///
/// `execute` validates its messages up front; this covers callers that
/// build segments themselves and go straight to `I2CTransfer::transfer`.
pub(crate) fn check_segments(segments: &[Segment]) -> Result<()> {
    if segments.len() > I2C_RDWR_IOCTL_MAX_MSGS {
        return Err(Error::TooManyMessages {
            count: segments.len(),
            max: I2C_RDWR_IOCTL_MAX_MSGS,
        });
    }
    for (index, segment) in segments.iter().enumerate() {
        let len = segment.buffer().capacity();
        if len > usize::from(u16::max_value()) {
            return Err(Error::MessageTooLong { index, len });
        }
    }
    Ok(())
}

fn validate(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::EmptyTransaction);
    }
    if messages.len() > I2C_RDWR_IOCTL_MAX_MSGS {
        return Err(Error::TooManyMessages {
            count: messages.len(),
            max: I2C_RDWR_IOCTL_MAX_MSGS,
        });
    }
    for (index, message) in messages.iter().enumerate() {
        if message.len() > usize::from(u16::max_value()) {
            return Err(Error::MessageTooLong {
                index,
                len: message.len(),
            });
        }
    }
    Ok(())
}

/// Run `messages` on `bus` in a single combined transfer
///
/// Each message gets a freshly allocated buffer and its own slave address
/// (not the one selected on the bus).  After the transfer, the bytes of
/// every read message are returned under its tag, or under
/// `Tag::Index(position)` when it has none.  Writes produce no entry, so an
/// all-write transaction returns an empty map.
///
/// Two reads with the same tag are not merged: the later message wins.
///
/// A failed transfer returns the error and no data.
pub fn execute<B: I2CTransfer + ?Sized>(
    bus: &mut B,
    messages: Vec<Message>,
) -> Result<HashMap<Tag, Vec<u8>>> {
    validate(&messages)?;

    let mut segments = Vec::with_capacity(messages.len());
    let mut pending: HashMap<Tag, (usize, usize)> = HashMap::new();
    for (index, message) in messages.iter().enumerate() {
        let segment = Segment::from_message(message);
        trace!(
            "segment {}: addr=0x{:02x} flags={:?} len={}",
            index,
            segment.address(),
            segment.flags(),
            segment.buffer().capacity()
        );
        segments.push(segment);
        if let Some(key) = message.result_key(index) {
            pending.insert(key, (index, message.len()));
        }
    }

    debug!(
        "transaction: {} messages, {} tagged reads",
        segments.len(),
        pending.len()
    );
    let completed = bus.transfer(&mut segments)?;
    if completed as usize != segments.len() {
        return Err(Error::IncompleteTransfer {
            submitted: segments.len(),
            completed: completed as usize,
        });
    }

    let mut results = HashMap::with_capacity(pending.len());
    for (key, (index, len)) in pending {
        results.insert(key, buffer::decode(segments[index].buffer(), len)?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockI2CBus;
    use nix::errno::Errno;

    fn bus_with_eeprom() -> MockI2CBus {
        let mut bus = MockI2CBus::new();
        bus.device(0x50).write_regs(0x10, &[0xde, 0xad, 0xbe, 0xef]);
        bus.device(0x51).write_regs(0x00, &[1, 2, 3]);
        bus
    }

    #[test]
    fn write_then_read_returns_tagged_bytes() {
        let mut bus = MockI2CBus::new();
        let results = execute(
            &mut bus,
            vec![
                Message::write(vec![24, 1, 2, 3]).with_address(0x42),
                Message::read(3).with_address(0x42).with_tag("x"),
            ],
        )
        .unwrap();

        assert_eq!(bus.transfer_log().len(), 1);
        assert_eq!(results.len(), 1);
        // read continues from where the write left the register pointer
        assert_eq!(results[&Tag::from("x")], vec![0, 0, 0]);
        assert_eq!(bus.device(0x42).read_regs(24, 3), vec![1, 2, 3]);
    }

    #[test]
    fn untagged_reads_keyed_by_position() {
        let mut bus = bus_with_eeprom();
        let results = Transaction::new()
            .message(Message::write(vec![0x10]).with_address(0x50))
            .message(Message::read(4).with_address(0x50))
            .message(Message::write(vec![0x00]).with_address(0x51))
            .message(Message::read(2).with_address(0x51))
            .execute(&mut bus)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[&Tag::Index(1)], vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(results[&Tag::Index(3)], vec![1, 2]);
    }

    #[test]
    fn all_write_transaction_yields_empty_map() {
        let mut bus = MockI2CBus::new();
        let results = execute(
            &mut bus,
            vec![
                Message::write(vec![0, 1]).with_address(0x20),
                Message::write(vec![1, 2]).with_address(0x20),
            ],
        )
        .unwrap();
        assert!(results.is_empty());
        assert_eq!(bus.device(0x20).read_regs(0, 2), vec![1, 2]);
    }

    #[test]
    fn duplicate_tags_last_read_wins() {
        let mut bus = bus_with_eeprom();
        let results = execute(
            &mut bus,
            vec![
                Message::write(vec![0x10]).with_address(0x50),
                Message::read(2).with_address(0x50).with_tag("dup"),
                Message::write(vec![0x00]).with_address(0x51),
                Message::read(3).with_address(0x51).with_tag("dup"),
            ],
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[&Tag::from("dup")], vec![1, 2, 3]);
    }

    #[test]
    fn explicit_index_tag_overwrites_positional_key() {
        let mut bus = bus_with_eeprom();
        let results = execute(
            &mut bus,
            vec![
                Message::write(vec![0x10]).with_address(0x50),
                Message::read(1).with_address(0x50),
                Message::read(1).with_address(0x50).with_tag(1),
            ],
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[&Tag::Index(1)], vec![0xad]);
    }

    #[test]
    fn messages_keep_order_address_and_flags() {
        let mut bus = MockI2CBus::new();
        execute(
            &mut bus,
            vec![
                Message::write(vec![0x00]).with_address(0x3c),
                Message::read(2).with_address(0x3c).no_start(),
                Message::read(1).ten_bit_addressing().with_address(0x123),
                Message::read(1),
            ],
        )
        .unwrap();

        let log = &bus.transfer_log()[0];
        let shape: Vec<_> = log.iter().map(|s| (s.address, s.flags, s.len)).collect();
        assert_eq!(
            shape,
            vec![
                (0x3c, MessageFlags::empty(), 1),
                (0x3c, MessageFlags::READ | MessageFlags::NO_START, 2),
                (0x123, MessageFlags::READ | MessageFlags::TEN, 1),
                (0, MessageFlags::READ, 1),
            ]
        );
    }

    #[test]
    fn transaction_ignores_bus_selected_slave() {
        use crate::core::I2CBus;

        let mut bus = MockI2CBus::new();
        bus.set_slave_address(0x77).unwrap();
        execute(&mut bus, vec![Message::read(1)]).unwrap();
        assert_eq!(bus.transfer_log()[0][0].address, 0);
    }

    #[test]
    fn empty_write_and_zero_length_read() {
        let mut bus = MockI2CBus::new();
        let results = execute(
            &mut bus,
            vec![
                Message::write(Vec::new()).with_address(0x10),
                Message::read(0).with_address(0x10).with_tag("none"),
            ],
        )
        .unwrap();
        assert_eq!(results[&Tag::from("none")], Vec::<u8>::new());
    }

    #[test]
    fn empty_transaction_rejected() {
        let mut bus = MockI2CBus::new();
        match execute(&mut bus, Vec::new()) {
            Err(Error::EmptyTransaction) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(bus.transfer_log().is_empty());
    }

    #[test]
    fn too_many_messages_rejected() {
        let mut bus = MockI2CBus::new();
        let messages = (0..=I2C_RDWR_IOCTL_MAX_MSGS).map(|_| Message::read(1)).collect();
        match execute(&mut bus, messages) {
            Err(Error::TooManyMessages { count: 43, max: 42 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_message_rejected() {
        let mut bus = MockI2CBus::new();
        match execute(&mut bus, vec![Message::read(1), Message::read(0x1_0000)]) {
            Err(Error::MessageTooLong { index: 1, len: 0x1_0000 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(bus.transfer_log().is_empty());
    }

    #[test]
    fn failed_transfer_returns_no_data() {
        let mut bus = bus_with_eeprom();
        bus.fail_next(Errno::ENXIO);
        match execute(
            &mut bus,
            vec![
                Message::write(vec![0x10]).with_address(0x50),
                Message::read(4).with_address(0x50),
            ],
        ) {
            Err(Error::Ioctl { op: "transfer", source: Errno::ENXIO }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_transfer_is_an_error() {
        let mut bus = MockI2CBus::new();
        bus.complete_only(1);
        match execute(&mut bus, vec![Message::write(vec![0]), Message::read(1)]) {
            Err(Error::IncompleteTransfer {
                submitted: 2,
                completed: 1,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transaction_collects_from_iterator() {
        let tx: Transaction = (0..3).map(|_| Message::read(1)).collect();
        assert_eq!(tx.len(), 3);
        assert!(Transaction::new().is_empty());
    }
}
