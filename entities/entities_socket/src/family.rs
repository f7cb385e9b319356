//! Address Family, Socket Type and Protocol
//!
//! The classification triple a socket is created with. Each type maps to and
//! from the platform's raw integer constants and to the textual names used by
//! configuration keys and diagnostic output.

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

#[cfg(unix)]
mod raw {
    pub const AF_INET: i32 = libc::AF_INET;
    pub const AF_INET6: i32 = libc::AF_INET6;
    pub const AF_UNIX: i32 = libc::AF_UNIX;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const AF_BLUETOOTH: i32 = libc::AF_BLUETOOTH;
    // No native Bluetooth sockets here; BlueZ numbering keeps the family distinct.
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub const AF_BLUETOOTH: i32 = 31;

    pub const SOCK_STREAM: i32 = libc::SOCK_STREAM;
    pub const SOCK_DGRAM: i32 = libc::SOCK_DGRAM;
    pub const SOCK_RAW: i32 = libc::SOCK_RAW;

    pub const IPPROTO_TCP: i32 = libc::IPPROTO_TCP;
    pub const IPPROTO_UDP: i32 = libc::IPPROTO_UDP;
    pub const IPPROTO_ICMP: i32 = libc::IPPROTO_ICMP;
    pub const BTPROTO_RFCOMM: i32 = 3;
    pub const BTPROTO_L2CAP: i32 = 0;
}

#[cfg(windows)]
mod raw {
    pub const AF_INET: i32 = 2;
    pub const AF_INET6: i32 = 23;
    pub const AF_UNIX: i32 = 1;
    pub const AF_BLUETOOTH: i32 = 32;

    pub const SOCK_STREAM: i32 = 1;
    pub const SOCK_DGRAM: i32 = 2;
    pub const SOCK_RAW: i32 = 3;

    pub const IPPROTO_TCP: i32 = 6;
    pub const IPPROTO_UDP: i32 = 17;
    pub const IPPROTO_ICMP: i32 = 1;
    pub const BTPROTO_RFCOMM: i32 = 3;
    pub const BTPROTO_L2CAP: i32 = 0x0100;
}

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressFamily {
    /// IPv4
    #[default]
    Inet,
    /// IPv6
    Inet6,
    /// Local (Unix-domain) sockets
    Unix,
    /// Bluetooth (RFCOMM / L2CAP)
    Bluetooth,
    /// Any other platform family, kept as its raw value
    Other(i32),
}

impl AddressFamily {
    /// Map a raw platform family value
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            raw::AF_INET => AddressFamily::Inet,
            raw::AF_INET6 => AddressFamily::Inet6,
            raw::AF_UNIX => AddressFamily::Unix,
            raw::AF_BLUETOOTH => AddressFamily::Bluetooth,
            other => AddressFamily::Other(other),
        }
    }

    /// Raw platform family value
    pub fn as_raw(self) -> i32 {
        match self {
            AddressFamily::Inet => raw::AF_INET,
            AddressFamily::Inet6 => raw::AF_INET6,
            AddressFamily::Unix => raw::AF_UNIX,
            AddressFamily::Bluetooth => raw::AF_BLUETOOTH,
            AddressFamily::Other(raw) => raw,
        }
    }

    /// Parse a family name (`INET`, `INET6`, `UNIX`, `BTH`, `BLUETOOTH`) or number
    ///
    /// Matching is case-insensitive.
    ///
    /// # Returns
    ///
    /// * `Some(AddressFamily)` - Recognized name or numeric value
    /// * `None` - Unknown name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_uppercase().as_str() {
            "INET" | "AF_INET" => Some(AddressFamily::Inet),
            "INET6" | "AF_INET6" => Some(AddressFamily::Inet6),
            "UNIX" | "AF_UNIX" | "LOCAL" => Some(AddressFamily::Unix),
            "BTH" | "BLUETOOTH" | "AF_BLUETOOTH" => Some(AddressFamily::Bluetooth),
            _ => name.parse::<i32>().ok().map(Self::from_raw),
        }
    }

    /// Diagnostic name; unknown families render as their number
    pub fn name(self) -> String {
        match self {
            AddressFamily::Inet => "INET".to_string(),
            AddressFamily::Inet6 => "INET6".to_string(),
            AddressFamily::Unix => "UNIX".to_string(),
            AddressFamily::Bluetooth => "BTH".to_string(),
            AddressFamily::Other(raw) => raw.to_string(),
        }
    }

    /// Whether the family is resolved through the system name service
    pub fn is_ip(self) -> bool {
        matches!(self, AddressFamily::Inet | AddressFamily::Inet6)
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Socket type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SocketType {
    /// Connection-oriented byte stream
    #[default]
    Stream,
    /// Connectionless datagrams
    Datagram,
    /// Raw protocol access
    Raw,
    /// Any other platform type, kept as its raw value
    Other(i32),
}

impl SocketType {
    /// Map a raw platform type value
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            raw::SOCK_STREAM => SocketType::Stream,
            raw::SOCK_DGRAM => SocketType::Datagram,
            raw::SOCK_RAW => SocketType::Raw,
            other => SocketType::Other(other),
        }
    }

    /// Raw platform type value
    pub fn as_raw(self) -> i32 {
        match self {
            SocketType::Stream => raw::SOCK_STREAM,
            SocketType::Datagram => raw::SOCK_DGRAM,
            SocketType::Raw => raw::SOCK_RAW,
            SocketType::Other(raw) => raw,
        }
    }

    /// Parse a type name (`STREAM`, `DGRAM`, `RAW`) or number, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_uppercase().as_str() {
            "STREAM" | "SOCK_STREAM" => Some(SocketType::Stream),
            "DGRAM" | "SOCK_DGRAM" => Some(SocketType::Datagram),
            "RAW" | "SOCK_RAW" => Some(SocketType::Raw),
            _ => name.parse::<i32>().ok().map(Self::from_raw),
        }
    }

    /// Diagnostic name; unknown types render as their number
    pub fn name(self) -> String {
        match self {
            SocketType::Stream => "STREAM".to_string(),
            SocketType::Datagram => "DGRAM".to_string(),
            SocketType::Raw => "RAW".to_string(),
            SocketType::Other(raw) => raw.to_string(),
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Protocol number
///
/// Protocol numbers are only meaningful together with a family: on Linux
/// `L2CAP` and "default" share the value 0. Use [`Protocol::name`] with the
/// owning family to render one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol(i32);

impl Protocol {
    /// Let the platform pick
    pub const DEFAULT: Protocol = Protocol(0);
    pub const TCP: Protocol = Protocol(raw::IPPROTO_TCP);
    pub const UDP: Protocol = Protocol(raw::IPPROTO_UDP);
    pub const ICMP: Protocol = Protocol(raw::IPPROTO_ICMP);
    pub const RFCOMM: Protocol = Protocol(raw::BTPROTO_RFCOMM);
    pub const L2CAP: Protocol = Protocol(raw::BTPROTO_L2CAP);

    /// Wrap a raw protocol number
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw protocol number
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Parse one of the well-known protocol names or a number
    ///
    /// Names outside `TCP`, `UDP`, `ICMP`, `RFCOMM` and `L2CAP` return `None`;
    /// callers may fall back to the system protocol database.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_uppercase().as_str() {
            "TCP" => Some(Protocol::TCP),
            "UDP" => Some(Protocol::UDP),
            "ICMP" => Some(Protocol::ICMP),
            "RFCOMM" => Some(Protocol::RFCOMM),
            "L2CAP" => Some(Protocol::L2CAP),
            _ => name.parse::<i32>().ok().map(Protocol),
        }
    }

    /// Diagnostic name in the context of `family`
    pub fn name(self, family: AddressFamily) -> String {
        match family {
            AddressFamily::Inet | AddressFamily::Inet6 => match self {
                Protocol::TCP => "TCP".to_string(),
                Protocol::UDP => "UDP".to_string(),
                Protocol::ICMP => "ICMP".to_string(),
                other => other.0.to_string(),
            },
            AddressFamily::Bluetooth => match self {
                Protocol::RFCOMM => "RFCOMM".to_string(),
                Protocol::L2CAP => "L2CAP".to_string(),
                other => other.0.to_string(),
            },
            _ => self.0.to_string(),
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::TCP
    }
}
