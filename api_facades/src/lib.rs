//! API Facades Layer
//!
//! The operation set external callers use. Callers hold only a [`HandleId`];
//! every call looks the handle up in a process-wide registry, runs under that
//! handle's lock and reports failures through the handle's last-error record
//! (or the process-wide slot when there is no live handle).
//!
//! All facades call underlying Rust modules from inner layers.
//!
//! ## Examples
//!
//! ```no_run
//! use api_facades::global;
//!
//! let sockets = global();
//! let id = sockets.create_from_pairs([("remote_addr", "127.0.0.1"), ("remote_port", "7")])?;
//! sockets.writeln(id, b"echo")?;
//! let line = sockets.readline(id)?;
//! sockets.destroy(id)?;
//! # Ok::<(), infrastructure_socket_errors::SocketError>(())
//! ```

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

pub mod socket_facades;

pub use entities_socket::HandleId;
pub use socket_facades::{global, sleep, SocketManager};
