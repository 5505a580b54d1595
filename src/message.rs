// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::flags::{MessageFlags, MessageOptions, DEFAULT_SLAVE_ADDRESS};

/// Key under which the bytes of a read message are returned
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// Position of the message within its transaction
    Index(usize),
    /// Caller-chosen name
    Name(String),
}

impl From<usize> for Tag {
    fn from(index: usize) -> Tag {
        Tag::Index(index)
    }
}

impl<'a> From<&'a str> for Tag {
    fn from(name: &'a str) -> Tag {
        Tag::Name(name.to_owned())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Tag {
        Tag::Name(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Tag::Index(index) => write!(f, "#{}", index),
            Tag::Name(ref name) => f.write_str(name),
        }
    }
}

/// What a message does on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Read this many bytes from the slave
    Read(usize),
    /// Write these bytes to the slave
    Write(Vec<u8>),
}

/// One segment of a transaction
///
/// Messages carry their own slave address, independent of the address
/// selected on the bus for single operations.
///
/// ```
/// use i2cbus::Message;
///
/// let msgs = vec![
///     Message::write(vec![0x18, 1, 2, 3]).with_address(0x42),
///     Message::read(3).with_address(0x42).with_tag("x"),
/// ];
/// assert!(msgs[1].is_read());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    direction: Direction,
    address: Option<u16>,
    options: MessageOptions,
    tag: Option<Tag>,
}

impl Message {
    /// Read `len` bytes from the slave
    pub fn read(len: usize) -> Message {
        Message::new(Direction::Read(len))
    }

    /// Write `data` to the slave
    pub fn write<D: Into<Vec<u8>>>(data: D) -> Message {
        Message::new(Direction::Write(data.into()))
    }

    pub fn new(direction: Direction) -> Message {
        Message {
            direction,
            address: None,
            options: MessageOptions::default(),
            tag: None,
        }
    }

    /// Set the slave address of this message
    pub fn with_address(mut self, address: u16) -> Message {
        self.address = Some(address);
        self
    }

    /// Key the bytes of this read under `tag` instead of its position
    ///
    /// Tags on write messages are accepted and ignored.
    pub fn with_tag<T: Into<Tag>>(mut self, tag: T) -> Message {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_options(mut self, options: MessageOptions) -> Message {
        self.options = options;
        self
    }

    /// Use 10-bit addressing for this message
    pub fn ten_bit_addressing(mut self) -> Message {
        self.options.ten_bit_addressing = true;
        self
    }

    /// Do not abort the transaction when the slave NAKs
    pub fn ignore_nak(mut self) -> Message {
        self.options.ignore_nak = true;
        self
    }

    /// Suppress the master ACK on reads
    pub fn no_read_ack(mut self) -> Message {
        self.options.no_read_ack = true;
        self
    }

    /// Omit the repeated START and address before this message
    pub fn no_start(mut self) -> Message {
        self.options.no_start = true;
        self
    }

    /// Invert the read/write bit
    pub fn revise_rw_bit(mut self) -> Message {
        self.options.revise_rw_bit = true;
        self
    }

    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    pub fn is_read(&self) -> bool {
        match self.direction {
            Direction::Read(_) => true,
            Direction::Write(_) => false,
        }
    }

    /// Number of bytes moved by this message
    pub fn len(&self) -> usize {
        match self.direction {
            Direction::Read(len) => len,
            Direction::Write(ref data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slave address, or `DEFAULT_SLAVE_ADDRESS` if none was given
    pub fn address(&self) -> u16 {
        self.address.unwrap_or(DEFAULT_SLAVE_ADDRESS)
    }

    pub fn options(&self) -> MessageOptions {
        self.options
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub fn flags(&self) -> MessageFlags {
        self.options.flags(self.is_read())
    }

    /// Key for the result of this message at position `index`
    ///
    /// Writes never produce a result.
    pub fn result_key(&self, index: usize) -> Option<Tag> {
        if !self.is_read() {
            return None;
        }
        Some(self.tag.clone().unwrap_or(Tag::Index(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_defaults_to_zero() {
        assert_eq!(Message::read(1).address(), DEFAULT_SLAVE_ADDRESS);
        assert_eq!(Message::read(1).with_address(0x50).address(), 0x50);
    }

    #[test]
    fn untagged_read_keys_by_position() {
        assert_eq!(Message::read(2).result_key(3), Some(Tag::Index(3)));
        assert_eq!(
            Message::read(2).with_tag("temp").result_key(3),
            Some(Tag::Name("temp".into()))
        );
    }

    #[test]
    fn writes_have_no_result_key() {
        assert_eq!(Message::write(vec![1]).result_key(0), None);
        assert_eq!(Message::write(vec![1]).with_tag("x").result_key(0), None);
    }

    #[test]
    fn builder_options_reach_flags() {
        let msg = Message::read(4).ten_bit_addressing().ignore_nak();
        assert_eq!(
            msg.flags(),
            MessageFlags::READ | MessageFlags::TEN | MessageFlags::IGNORE_NAK
        );
        let msg = Message::write(vec![0]).no_start().revise_rw_bit().no_read_ack();
        assert_eq!(
            msg.flags(),
            MessageFlags::NO_START | MessageFlags::REVISE_RW_BIT | MessageFlags::NO_READ_ACK
        );
    }

    #[test]
    fn lengths() {
        assert_eq!(Message::read(7).len(), 7);
        assert_eq!(Message::write(&[1u8, 2][..]).len(), 2);
        assert!(Message::write(Vec::new()).is_empty());
    }

    #[test]
    fn tag_display() {
        assert_eq!(Tag::from(2).to_string(), "#2");
        assert_eq!(Tag::from("x").to_string(), "x");
    }
}
