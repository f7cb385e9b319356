//! Socket Error Taxonomy
//!
//! One error type for every socket operation. Each variant knows its numeric
//! code (platform errno, Winsock code or resolver code; `-1` for purely
//! textual conditions) so callers can keep the classic errno/message pair.

/*
 * %CopyrightBegin%
 *
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright Lee Barney 2025. All Rights Reserved.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 * %CopyrightEnd%
 */

use std::io;

use entities_socket::{AddressFamily, HandleId, SocketState};

use crate::normalize::{codes, describe_os_error};

/// Socket error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// Name or service resolution failed
    #[error("{message}")]
    Resolution { code: i32, message: String },
    /// Connect did not complete within the handle's timeout
    #[error("{message}")]
    ConnectTimeout { message: String },
    /// Peer closed the stream, or a stream read/write moved zero bytes
    #[error("{message}")]
    ConnectionReset { message: String },
    /// Address family not usable for the requested operation
    #[error("address family {0} not supported")]
    InvalidAddressFamily(AddressFamily),
    /// Operation not allowed in the handle's current state
    #[error("{operation} not permitted while {state}")]
    InvalidState {
        operation: &'static str,
        state: SocketState,
    },
    /// Malformed caller input
    #[error("{0}")]
    InvalidArgument(String),
    /// No live handle with this identity
    #[error("invalid socket handle {0}")]
    UnknownHandle(HandleId),
    /// Any other platform failure
    #[error("{message}")]
    Platform { code: i32, message: String },
}

impl SocketError {
    /// Timeout waiting for a connect to complete
    pub fn connect_timeout() -> Self {
        SocketError::ConnectTimeout {
            message: describe_os_error(codes::ETIMEDOUT),
        }
    }

    /// Connection reset (also used for zero-byte stream transfers)
    pub fn connection_reset() -> Self {
        SocketError::ConnectionReset {
            message: describe_os_error(codes::ECONNRESET),
        }
    }

    /// Build from a raw platform code
    pub fn from_code(code: i32) -> Self {
        match code {
            codes::ECONNRESET => SocketError::connection_reset(),
            _ => SocketError::Platform {
                code,
                message: describe_os_error(code),
            },
        }
    }

    /// Numeric code for errno-style reporting
    ///
    /// # Returns
    ///
    /// The platform or resolver code, or `-1` when the failure has no code
    pub fn code(&self) -> i32 {
        match self {
            SocketError::Resolution { code, .. } => *code,
            SocketError::ConnectTimeout { .. } => codes::ETIMEDOUT,
            SocketError::ConnectionReset { .. } => codes::ECONNRESET,
            SocketError::InvalidAddressFamily(_) => codes::EAFNOSUPPORT,
            SocketError::Platform { code, .. } => *code,
            SocketError::InvalidState { .. }
            | SocketError::InvalidArgument(_)
            | SocketError::UnknownHandle(_) => -1,
        }
    }
}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => SocketError::from_code(code),
            None if err.kind() == io::ErrorKind::InvalidInput => {
                SocketError::InvalidArgument(err.to_string())
            }
            None => SocketError::Platform {
                code: -1,
                message: err.to_string(),
            },
        }
    }
}
