// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use bitflags::bitflags;

/// Slave address used by a transaction message that does not name one
pub const DEFAULT_SLAVE_ADDRESS: u16 = 0;

bitflags! {
    /// Flags of one `i2c_msg`, as defined in `include/uapi/linux/i2c.h`
    ///
    /// `READ` is handled by all adapters.  No other flags may be provided
    /// unless the adapter exported the relevant `I2C_FUNC_*` bits (see
    /// `I2CFunctions`).  The protocol mangling flags are only for use with
    /// broken/nonconforming slaves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageFlags: u16 {
        /// read data, from slave to master
        const READ = 0x0001;
        /// this is a ten bit chip address
        const TEN = 0x0010;
        /// length will be first received byte
        const RECV_LEN = 0x0400;
        /// if I2C_FUNC_PROTOCOL_MANGLING
        const NO_READ_ACK = 0x0800;
        /// if I2C_FUNC_PROTOCOL_MANGLING
        const IGNORE_NAK = 0x1000;
        /// if I2C_FUNC_PROTOCOL_MANGLING
        const REVISE_RW_BIT = 0x2000;
        /// if I2C_FUNC_NOSTART
        const NO_START = 0x4000;
        /// if I2C_FUNC_PROTOCOL_MANGLING
        const STOP = 0x8000;
    }
}

/// Per-message protocol options
///
/// Every option defaults to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MessageOptions {
    /// Address the slave with 10 bits
    pub ten_bit_addressing: bool,
    /// Keep going when the slave NAKs
    pub ignore_nak: bool,
    /// Do not acknowledge bytes on reads
    pub no_read_ack: bool,
    /// Omit the repeated START and address before this message
    pub no_start: bool,
    /// Invert the read/write bit for noncompliant slaves
    pub revise_rw_bit: bool,
}

impl MessageOptions {
    /// Encode these options into the kernel's flag word
    ///
    /// `READ` depends only on `is_read`; each other bit mirrors exactly one
    /// option.
    pub fn flags(&self, is_read: bool) -> MessageFlags {
        let mut flags = MessageFlags::empty();
        flags.set(MessageFlags::READ, is_read);
        flags.set(MessageFlags::TEN, self.ten_bit_addressing);
        flags.set(MessageFlags::IGNORE_NAK, self.ignore_nak);
        flags.set(MessageFlags::NO_READ_ACK, self.no_read_ack);
        flags.set(MessageFlags::NO_START, self.no_start);
        flags.set(MessageFlags::REVISE_RW_BIT, self.revise_rw_bit);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_encode_to_direction_only() {
        let options = MessageOptions::default();
        assert_eq!(options.flags(false), MessageFlags::empty());
        assert_eq!(options.flags(true), MessageFlags::READ);
    }

    #[test]
    fn kernel_bit_values() {
        let options = MessageOptions {
            ten_bit_addressing: true,
            no_start: true,
            ..MessageOptions::default()
        };
        assert_eq!(options.flags(true).bits(), 0x4011);
    }

    proptest! {
        #[test]
        fn set_bits_match_true_options(
            ten in any::<bool>(),
            nak in any::<bool>(),
            no_ack in any::<bool>(),
            no_start in any::<bool>(),
            rev in any::<bool>(),
            is_read in any::<bool>(),
        ) {
            let options = MessageOptions {
                ten_bit_addressing: ten,
                ignore_nak: nak,
                no_read_ack: no_ack,
                no_start,
                revise_rw_bit: rev,
            };
            let flags = options.flags(is_read);
            prop_assert_eq!(flags.contains(MessageFlags::TEN), ten);
            prop_assert_eq!(flags.contains(MessageFlags::IGNORE_NAK), nak);
            prop_assert_eq!(flags.contains(MessageFlags::NO_READ_ACK), no_ack);
            prop_assert_eq!(flags.contains(MessageFlags::NO_START), no_start);
            prop_assert_eq!(flags.contains(MessageFlags::REVISE_RW_BIT), rev);
            prop_assert_eq!(flags.contains(MessageFlags::READ), is_read);
            prop_assert!(!flags.intersects(MessageFlags::STOP | MessageFlags::RECV_LEN));
        }
    }
}
