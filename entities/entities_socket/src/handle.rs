//! Handle identities and lifecycle states

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

use std::fmt;

/// Process-unique identity of a registered socket handle
///
/// Identities are allocated from a monotonically increasing counter and are
/// never reused while the process lives. Zero is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Wrap a raw identity value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identity value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for HandleId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a socket handle
///
/// `Error` is sticky: once a hard I/O failure has been observed the handle
/// refuses further I/O until it is closed or reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SocketState {
    /// Descriptor created, nothing bound or connected
    #[default]
    Init,
    /// Bound to a local address
    Bound,
    /// Accepting connections
    Listening,
    /// Connected to a peer
    Connected,
    /// One or both directions shut down
    ShutDown,
    /// Descriptor released
    Closed,
    /// Hard failure observed
    Error,
}

impl SocketState {
    /// Upper-case name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            SocketState::Init => "INIT",
            SocketState::Bound => "BOUND",
            SocketState::Listening => "LISTENING",
            SocketState::Connected => "CONNECTED",
            SocketState::ShutDown => "SHUTDOWN",
            SocketState::Closed => "CLOSED",
            SocketState::Error => "ERROR",
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
