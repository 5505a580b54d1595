// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error that occurred while operating on an I2C bus
///
/// Every variant carrying an `op` names the operation that failed
/// (e.g. `"set_slave_address"`, `"smbus_read_byte_data"`, `"transfer"`).
#[derive(Debug, Error)]
pub enum Error {
    /// The device node could not be opened
    #[error("failed to open {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bus handle has been closed
    #[error("{op}: bus closed")]
    Closed { op: &'static str },

    /// An ioctl on the device node failed
    #[error("{op} failed: {source}")]
    Ioctl {
        op: &'static str,
        #[source]
        source: nix::Error,
    },

    /// A plain read(2)/write(2) on the device node failed
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// More bytes were requested from a buffer than it holds
    #[error("length mismatch: requested {requested} bytes from a buffer of {capacity}")]
    LengthMismatch { requested: usize, capacity: usize },

    /// An SMBus block exceeds the protocol limit
    #[error("block of {len} bytes exceeds the SMBus limit of {max}")]
    BlockTooLong { len: usize, max: usize },

    /// A transaction must carry at least one message
    #[error("transaction contains no messages")]
    EmptyTransaction,

    /// The kernel refuses transactions above `I2C_RDRW_IOCTL_MAX_MSGS`
    #[error("transaction contains {count} messages, at most {max} are allowed")]
    TooManyMessages { count: usize, max: usize },

    /// A message length does not fit the kernel's 16-bit length field
    #[error("message {index} is {len} bytes long, which exceeds the i2c_msg length field")]
    MessageTooLong { index: usize, len: usize },

    /// The adapter processed only part of a transaction
    #[error("transfer completed {completed} of {submitted} messages")]
    IncompleteTransfer { submitted: usize, completed: usize },
}

impl Error {
    pub(crate) fn ioctl(op: &'static str) -> impl FnOnce(nix::Error) -> Error {
        move |source| Error::Ioctl { op, source }
    }

    pub(crate) fn io(op: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Io { op, source }
    }

    /// The native errno behind this error, if there is one
    pub fn errno(&self) -> Option<nix::errno::Errno> {
        match *self {
            Error::Ioctl { source, .. } => Some(source),
            Error::Open { ref source, .. } | Error::Io { ref source, .. } => source
                .raw_os_error()
                .map(nix::errno::Errno::from_i32),
            _ => None,
        }
    }
}

/// Result of an I2C operation
pub type Result<T> = std::result::Result<T, Error>;
