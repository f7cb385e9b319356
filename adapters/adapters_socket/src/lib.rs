//! Adapters Layer: Portable Socket Handles
//!
//! Wraps the platform socket API (BSD sockets on Unix, Winsock on Windows)
//! behind one handle type with a uniform error model. IPv4, IPv6, Unix-domain
//! and Bluetooth (RFCOMM/L2CAP) endpoints are supported.
//!
//! ## Overview
//!
//! The `adapters_socket` crate provides:
//! - **Configuration**: [`SocketConfig`] built directly or from key/value pairs
//! - **Address translation**: host/service pairs to native addresses and back
//! - **Name resolution**: forward and reverse lookups through the system resolver
//! - **Lifecycle**: bind, listen, accept, connect (with timeout), shutdown, close
//! - **I/O**: send/recv, sendto/recvfrom, CRLF-aware line reading, readiness polling
//! - **Options**: generic `setsockopt`/`getsockopt` plus typed helpers
//!
//! ## Architecture
//!
//! This crate is part of the adapters layer in the CLEAN architecture implementation.
//! It depends on:
//! - `entities_socket`: Address, family, type and state vocabulary
//! - `infrastructure_socket_errors`: Error taxonomy and last-error records
//!
//! ## Examples
//!
//! ```no_run
//! use adapters_socket::{Socket, SocketConfig};
//! use entities_socket::AddressFamily;
//!
//! let config = SocketConfig::tcp(AddressFamily::Inet).with_remote(Some("example.com"), Some("80"));
//! let mut socket = Socket::create(&config)?;
//! socket.writeln(b"HEAD / HTTP/1.0")?;
//! socket.writeln(b"")?;
//! let status = socket.readline()?;
//! # Ok::<(), infrastructure_socket_errors::SocketError>(())
//! ```
//!
//! ## See Also
//!
//! - [`entities_socket`](../entities_socket/index.html): Socket vocabulary
//! - [`api_facades`](../api_facades/index.html): Handle-identity operation surface

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

pub mod address;
pub mod config;
pub mod io;
pub mod line;
pub mod options;
pub mod readiness;
pub mod resolver;
pub mod socket;

pub use address::{NativeAddress, UNIX_PATH_MAX};
pub use config::{clamp_backlog, duration_from_millis, SocketConfig, DEFAULT_TIMEOUT, LISTEN_BACKLOG_MAX};
pub use line::{LineBuffer, LineOutcome, PeekSource};
pub use readiness::{Interest, Readiness};
pub use resolver::{
    lookup, name_info, protocol_by_name, resolve, resolve_name, reverse_resolve, reverse_resolve_host,
    LookupHints, ResolvedAddress,
};
pub use socket::{RawDescriptor, Socket};
