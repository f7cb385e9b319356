//! Typed Socket Addresses
//!
//! [`Address`] is the family-tagged address a handle remembers as its local
//! or remote endpoint. It replaces a raw, length-prefixed byte buffer: each
//! family carries exactly the fields it needs, and conversion to the native
//! byte layout happens at the descriptor boundary in `adapters_socket`.
//!
//! Rendering rules:
//! - IPv4 hosts are dotted quads.
//! - IPv6 hosts are the eight uncompressed groups, four lower-case hex digits
//!   each, taken in network order.
//! - Unix hosts are the filesystem path; the service is empty.
//! - Bluetooth hosts are the device address; the service is the RFCOMM
//!   channel or L2CAP PSM.

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
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;

use crate::bdaddr::BdAddr;
use crate::family::AddressFamily;

/// Upper bound on any native socket address this stack produces or accepts
pub const SOCKADDR_SIZE_MAX: usize = 128;

/// Why an address is being built
///
/// `Listen` asks the resolver for a wildcard-capable (passive) address and
/// substitutes port `"0"` for an empty service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressPurpose {
    #[default]
    Connect,
    Listen,
}

/// Family-tagged socket address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Inet(SocketAddrV4),
    Inet6(SocketAddrV6),
    Unix(PathBuf),
    Rfcomm { device: BdAddr, channel: u8 },
    L2cap { device: BdAddr, psm: u16 },
}

impl Address {
    /// Family this address belongs to
    pub fn family(&self) -> AddressFamily {
        match self {
            Address::Inet(_) => AddressFamily::Inet,
            Address::Inet6(_) => AddressFamily::Inet6,
            Address::Unix(_) => AddressFamily::Unix,
            Address::Rfcomm { .. } | Address::L2cap { .. } => AddressFamily::Bluetooth,
        }
    }

    /// Host part in textual form
    pub fn host(&self) -> String {
        match self {
            Address::Inet(addr) => addr.ip().to_string(),
            Address::Inet6(addr) => ipv6_full(addr.ip()),
            Address::Unix(path) => path.to_string_lossy().into_owned(),
            Address::Rfcomm { device, .. } | Address::L2cap { device, .. } => device.to_string(),
        }
    }

    /// Service part in textual form (port, channel or PSM; empty for Unix)
    pub fn service(&self) -> String {
        match self {
            Address::Inet(addr) => addr.port().to_string(),
            Address::Inet6(addr) => addr.port().to_string(),
            Address::Unix(_) => String::new(),
            Address::Rfcomm { channel, .. } => channel.to_string(),
            Address::L2cap { psm, .. } => psm.to_string(),
        }
    }

    /// IP view of the address, if it is one
    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Address::Inet(addr) => Some(SocketAddr::V4(*addr)),
            Address::Inet6(addr) => Some(SocketAddr::V6(*addr)),
            _ => None,
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Address::Inet(v4),
            SocketAddr::V6(v6) => Address::Inet6(v6),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Inet(addr) => write!(f, "{}:{}", addr.ip(), addr.port()),
            Address::Inet6(addr) => write!(f, "[{}]:{}", ipv6_full(addr.ip()), addr.port()),
            Address::Unix(path) => write!(f, "{}", path.display()),
            Address::Rfcomm { device, .. } | Address::L2cap { device, .. } => {
                write!(f, "{}", device)
            }
        }
    }
}

/// Render an IPv6 address as eight uncompressed groups
///
/// # Examples
/// ```
/// use entities_socket::ipv6_full;
/// use std::net::Ipv6Addr;
///
/// assert_eq!(ipv6_full(&Ipv6Addr::LOCALHOST), "0000:0000:0000:0000:0000:0000:0000:0001");
/// ```
pub fn ipv6_full(addr: &Ipv6Addr) -> String {
    let s = addr.segments();
    format!(
        "{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}:{:04x}",
        s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]
    )
}
