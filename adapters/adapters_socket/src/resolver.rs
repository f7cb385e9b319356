//! Resolver Module
//!
//! Name and service resolution through the system resolver, plus the
//! protocol database lookup used by configuration parsing.
//!
//! `getaddrinfo`/`getnameinfo` are reentrant and called without extra
//! locking. `getprotobyname` returns static storage, so every call goes
//! through one process-wide lock.

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
use std::net::{IpAddr, SocketAddr};

use dns_lookup::{AddrInfoHints, LookupError, LookupErrorKind};
use entities_socket::{Address, AddressFamily, AddressPurpose, Protocol, SocketType};
use infrastructure_socket_errors::{describe_resolver_error, SocketError};
use lazy_static::lazy_static;
use parking_lot::Mutex;

#[cfg(unix)]
mod flags {
    pub const AF_UNSPEC: i32 = libc::AF_UNSPEC;
    pub const AI_PASSIVE: i32 = libc::AI_PASSIVE;
    pub const AI_CANONNAME: i32 = libc::AI_CANONNAME;
    pub const NI_NAMEREQD: i32 = libc::NI_NAMEREQD;
    pub const NI_NUMERICHOST: i32 = libc::NI_NUMERICHOST;
    pub const NI_NUMERICSERV: i32 = libc::NI_NUMERICSERV;
    pub const EAI_NONAME: i32 = libc::EAI_NONAME;
}

#[cfg(windows)]
mod flags {
    pub const AF_UNSPEC: i32 = 0;
    pub const AI_PASSIVE: i32 = 0x01;
    pub const AI_CANONNAME: i32 = 0x02;
    pub const NI_NAMEREQD: i32 = 0x04;
    pub const NI_NUMERICHOST: i32 = 0x02;
    pub const NI_NUMERICSERV: i32 = 0x08;
    pub const EAI_NONAME: i32 = 11001;
}

pub use flags::{AI_CANONNAME, AI_PASSIVE, NI_NAMEREQD, NI_NUMERICHOST, NI_NUMERICSERV};

lazy_static! {
    static ref LEGACY_RESOLVER_LOCK: Mutex<()> = Mutex::new(());
}

/// Hints narrowing a [`lookup`]
///
/// `None` fields leave the choice to the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupHints {
    pub family: Option<AddressFamily>,
    pub socket_type: Option<SocketType>,
    pub protocol: Option<Protocol>,
    /// `AI_*` flags
    pub flags: i32,
}

/// One resolver result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub family: AddressFamily,
    pub socket_type: SocketType,
    pub protocol: Protocol,
    pub address: Address,
    pub canonical_name: Option<String>,
}

/// Resolve `node`/`service` into every address the resolver reports
///
/// With `AI_PASSIVE` set and no service, port `"0"` is used. Empty strings
/// count as absent.
///
/// # Arguments
///
/// * `node` - Host name or numeric address
/// * `service` - Service name or port number
/// * `hints` - Family, type, protocol and flag constraints
///
/// # Returns
///
/// * `Ok(Vec<ResolvedAddress>)` - Results in resolver order
/// * `Err(SocketError::Resolution)` - Resolver failure with its code and text
pub fn lookup(
    node: Option<&str>,
    service: Option<&str>,
    hints: &LookupHints,
) -> Result<Vec<ResolvedAddress>, SocketError> {
    let node = node.filter(|n| !n.is_empty());
    let service = match service.filter(|s| !s.is_empty()) {
        None if hints.flags & AI_PASSIVE != 0 => Some("0"),
        other => other,
    };
    let ai_hints = AddrInfoHints {
        socktype: hints.socket_type.map_or(0, SocketType::as_raw),
        protocol: hints.protocol.map_or(0, Protocol::as_raw),
        address: hints.family.map_or(flags::AF_UNSPEC, AddressFamily::as_raw),
        flags: hints.flags,
    };

    let entries = dns_lookup::getaddrinfo(node, service, Some(ai_hints)).map_err(lookup_error)?;
    let mut results = Vec::new();
    for entry in entries {
        let info = entry.map_err(SocketError::from)?;
        results.push(ResolvedAddress {
            family: AddressFamily::from_raw(info.address),
            socket_type: SocketType::from_raw(info.socktype),
            protocol: Protocol::from_raw(info.protocol),
            address: Address::from(info.sockaddr),
            canonical_name: info.canonname,
        });
    }
    Ok(results)
}

/// Resolve the host and service of an IP address
///
/// # Arguments
///
/// * `address` - IPv4 or IPv6 address
/// * `flags` - `NI_*` flags
///
/// # Returns
///
/// * `Ok((host, service))` - Names reported by the resolver
/// * `Err(SocketError::InvalidAddressFamily)` - Not an IP address
/// * `Err(SocketError::Resolution)` - Resolver failure
pub fn name_info(address: &Address, flags: i32) -> Result<(String, String), SocketError> {
    let sockaddr = address
        .as_socket_addr()
        .ok_or(SocketError::InvalidAddressFamily(address.family()))?;
    dns_lookup::getnameinfo(&sockaddr, flags).map_err(lookup_error)
}

/// Resolve an address for creating, binding or connecting a handle
///
/// Returns the first result for the family/type/protocol triple.
pub fn resolve(
    family: AddressFamily,
    socket_type: SocketType,
    protocol: Protocol,
    host: Option<&str>,
    service: Option<&str>,
    purpose: AddressPurpose,
) -> Result<SocketAddr, SocketError> {
    let hints = LookupHints {
        family: Some(family),
        socket_type: Some(socket_type),
        protocol: Some(protocol),
        flags: match purpose {
            AddressPurpose::Listen => AI_PASSIVE,
            AddressPurpose::Connect => 0,
        },
    };
    let resolved = lookup(host, service, &hints)?;
    resolved
        .into_iter()
        .find_map(|entry| entry.address.as_socket_addr())
        .ok_or_else(|| SocketError::Resolution {
            code: flags::EAI_NONAME,
            message: describe_resolver_error(flags::EAI_NONAME),
        })
}

/// Resolve a host name to its first numeric address
///
/// IPv6 results are rendered as eight uncompressed groups.
pub fn resolve_name(name: &str) -> Result<String, SocketError> {
    let resolved = lookup(Some(name), None, &LookupHints::default())?;
    resolved
        .first()
        .map(|entry| entry.address.host())
        .ok_or_else(|| SocketError::Resolution {
            code: flags::EAI_NONAME,
            message: describe_resolver_error(flags::EAI_NONAME),
        })
}

/// Resolve an IP address to a host name
///
/// Fails when the resolver has no name for the address.
pub fn reverse_resolve(address: &Address) -> Result<String, SocketError> {
    name_info(address, NI_NAMEREQD).map(|(host, _)| host)
}

/// Resolve a textual IP address to a host name
pub fn reverse_resolve_host(host: &str) -> Result<String, SocketError> {
    let ip: IpAddr = host
        .trim()
        .parse()
        .map_err(|_| SocketError::InvalidArgument(format!("invalid address {}", host)))?;
    reverse_resolve(&Address::from(SocketAddr::new(ip, 0)))
}

/// Look up a protocol by name or number
///
/// Well-known names are answered directly; anything else goes to the
/// system protocol database.
pub fn protocol_by_name(name: &str) -> Option<Protocol> {
    Protocol::from_name(name).or_else(|| system_protocol(name.trim()))
}

#[cfg(unix)]
fn system_protocol(name: &str) -> Option<Protocol> {
    let cname = std::ffi::CString::new(name).ok()?;
    let _guard = LEGACY_RESOLVER_LOCK.lock();
    // SAFETY: the returned entry points into static storage that stays valid
    // until the next database call, which the lock excludes.
    unsafe {
        let entry = libc::getprotobyname(cname.as_ptr());
        if entry.is_null() {
            None
        } else {
            Some(Protocol::from_raw((*entry).p_proto))
        }
    }
}

#[cfg(windows)]
fn system_protocol(name: &str) -> Option<Protocol> {
    let _guard = LEGACY_RESOLVER_LOCK.lock();
    tracing::debug!("no protocol database entry for {:?}", name);
    None
}

fn lookup_error(err: LookupError) -> SocketError {
    if let LookupErrorKind::System = err.kind() {
        return SocketError::from(io::Error::from(err));
    }
    let code = err.error_num();
    SocketError::Resolution {
        code,
        message: describe_resolver_error(code),
    }
}
