//! Address Codec Module
//!
//! Converts between the textual `host`/`service` pair callers use, the typed
//! [`Address`], and the native socket address structures the platform
//! socket calls consume.
//!
//! Bluetooth addresses are laid out by hand:
//!
//! | Platform | Protocol | Layout | Length |
//! |----------|----------|--------|--------|
//! | Linux    | RFCOMM   | family `u16`, device `[u8; 6]`, channel `u8` | 10 |
//! | Linux    | L2CAP    | family `u16`, PSM `u16` LE, device `[u8; 6]`, CID `u16`, type `u8` | 14 |
//! | Windows  | both     | family `u16`, device `u64`, service GUID, port `u32` (packed) | 30 |

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

use std::path::{Path, PathBuf};

use entities_socket::{
    Address, AddressFamily, AddressPurpose, BdAddr, Protocol, SocketType, SOCKADDR_SIZE_MAX,
};
use infrastructure_socket_errors::SocketError;
use socket2::SockAddr;

use crate::resolver;

/// Longest Unix socket path accepted, excluding the terminating NUL
#[cfg(any(target_os = "linux", target_os = "android", windows))]
pub const UNIX_PATH_MAX: usize = 107;
#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
pub const UNIX_PATH_MAX: usize = 103;

/// Offset of the path inside `sockaddr_un` (after the family, or length + family)
const SUN_PATH_OFFSET: usize = 2;

/// A native socket address in its platform byte layout
#[derive(Clone, Copy)]
pub struct NativeAddress {
    bytes: [u8; SOCKADDR_SIZE_MAX],
    len: usize,
}

impl NativeAddress {
    fn from_slice(bytes: &[u8]) -> Result<Self, SocketError> {
        if bytes.len() > SOCKADDR_SIZE_MAX {
            return Err(SocketError::InvalidArgument(format!(
                "socket address of {} bytes exceeds {}",
                bytes.len(),
                SOCKADDR_SIZE_MAX
            )));
        }
        let mut native = Self {
            bytes: [0u8; SOCKADDR_SIZE_MAX],
            len: bytes.len(),
        };
        native.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(native)
    }

    /// Bytes actually in use
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for NativeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeAddress")
            .field("len", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// Build an address from a textual host and service
///
/// IP families go through the system resolver. Unix addresses take `host`
/// as the filesystem path. Bluetooth addresses parse `host` as a device
/// address and `service` as the RFCOMM channel (0 or empty becomes 1) or
/// the L2CAP PSM.
///
/// # Arguments
///
/// * `family`, `socket_type`, `protocol` - Triple the address is for
/// * `host` - Host name, numeric address, path or device address
/// * `service` - Port, service name, channel or PSM
/// * `purpose` - `Listen` requests a passive (wildcard-capable) address
///
/// # Returns
///
/// * `Ok(Address)` - Built address
/// * `Err(SocketError)` - Resolution failure or malformed input
pub fn pack(
    family: AddressFamily,
    socket_type: SocketType,
    protocol: Protocol,
    host: Option<&str>,
    service: Option<&str>,
    purpose: AddressPurpose,
) -> Result<Address, SocketError> {
    match family {
        AddressFamily::Unix => {
            let path = host
                .filter(|p| !p.is_empty())
                .ok_or_else(|| SocketError::InvalidArgument("missing socket path".to_string()))?;
            if path.len() > UNIX_PATH_MAX {
                return Err(SocketError::InvalidArgument(format!(
                    "socket path longer than {} bytes",
                    UNIX_PATH_MAX
                )));
            }
            Ok(Address::Unix(PathBuf::from(path)))
        }
        AddressFamily::Bluetooth => {
            let device = match host.map(str::trim).filter(|h| !h.is_empty()) {
                Some(text) => text
                    .parse::<BdAddr>()
                    .map_err(|e| SocketError::InvalidArgument(e.to_string()))?,
                None => BdAddr::default(),
            };
            let number = leading_number(service);
            if protocol == Protocol::RFCOMM {
                let channel = match number {
                    0 => 1,
                    n => u8::try_from(n).map_err(|_| {
                        SocketError::InvalidArgument(format!("invalid RFCOMM channel {}", n))
                    })?,
                };
                Ok(Address::Rfcomm { device, channel })
            } else if protocol == Protocol::L2CAP {
                let psm = u16::try_from(number).map_err(|_| {
                    SocketError::InvalidArgument(format!("invalid L2CAP PSM {}", number))
                })?;
                Ok(Address::L2cap { device, psm })
            } else {
                Err(SocketError::InvalidAddressFamily(family))
            }
        }
        _ => resolver::resolve(family, socket_type, protocol, host, service, purpose)
            .map(Address::from),
    }
}

/// Split an address into its textual host and service
pub fn unpack(address: &Address) -> (String, String) {
    (address.host(), address.service())
}

/// Convert a typed address for the socket calls
pub fn to_sock_addr(address: &Address) -> Result<SockAddr, SocketError> {
    match address {
        Address::Inet(_) | Address::Inet6(_) => match address.as_socket_addr() {
            Some(sockaddr) => Ok(SockAddr::from(sockaddr)),
            None => Err(SocketError::InvalidAddressFamily(address.family())),
        },
        Address::Unix(path) => SockAddr::unix(path).map_err(SocketError::from),
        Address::Rfcomm { .. } | Address::L2cap { .. } => {
            let native = encode(address)?;
            sock_addr_from_bytes(native.as_bytes())
        }
    }
}

/// Convert a native socket address reported by the platform
///
/// `protocol` disambiguates the Bluetooth layouts. An unnamed Unix address
/// decodes to an empty path.
pub fn from_sock_addr(addr: &SockAddr, protocol: Protocol) -> Result<Address, SocketError> {
    if let Some(sockaddr) = addr.as_socket() {
        return Ok(Address::from(sockaddr));
    }
    let family = AddressFamily::from_raw(i32::from(addr.family()));
    // SAFETY: `as_ptr` points at storage of at least `len` initialized bytes.
    let bytes = unsafe {
        std::slice::from_raw_parts(addr.as_ptr().cast::<u8>(), addr.len() as usize)
    };
    match family {
        AddressFamily::Unix => Ok(Address::Unix(unix_path(bytes))),
        AddressFamily::Bluetooth => decode_bluetooth(bytes, protocol),
        other => Err(SocketError::InvalidAddressFamily(other)),
    }
}

/// Encode an address into its native byte layout
pub fn encode(address: &Address) -> Result<NativeAddress, SocketError> {
    match address {
        Address::Inet(_) | Address::Inet6(_) | Address::Unix(_) => {
            let addr = to_sock_addr(address)?;
            // SAFETY: `as_ptr` points at storage of at least `len` initialized bytes.
            let bytes = unsafe {
                std::slice::from_raw_parts(addr.as_ptr().cast::<u8>(), addr.len() as usize)
            };
            NativeAddress::from_slice(bytes)
        }
        Address::Rfcomm { device, channel } => encode_bluetooth(*device, true, u32::from(*channel)),
        Address::L2cap { device, psm } => encode_bluetooth(*device, false, u32::from(*psm)),
    }
}

/// Decode a native byte layout
///
/// # Arguments
///
/// * `bytes` - Native socket address, at most [`SOCKADDR_SIZE_MAX`] bytes
/// * `protocol` - Protocol of the owning handle (selects the Bluetooth layout)
pub fn decode(bytes: &[u8], protocol: Protocol) -> Result<Address, SocketError> {
    let addr = sock_addr_from_bytes(bytes)?;
    from_sock_addr(&addr, protocol)
}

fn sock_addr_from_bytes(bytes: &[u8]) -> Result<SockAddr, SocketError> {
    let native = NativeAddress::from_slice(bytes)?;
    // SAFETY: at most SOCKADDR_SIZE_MAX bytes are copied into storage sized
    // for any socket address, and the reported length matches the copy.
    let (_, addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            std::ptr::copy_nonoverlapping(
                native.bytes.as_ptr(),
                storage.cast::<u8>(),
                native.len,
            );
            *len = native.len as _;
            Ok(())
        })
    }
    .map_err(SocketError::from)?;
    Ok(addr)
}

fn unix_path(bytes: &[u8]) -> PathBuf {
    let raw = bytes.get(SUN_PATH_OFFSET..).unwrap_or(&[]);
    // Abstract (leading NUL) and unnamed addresses have no filesystem path.
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    path_from_bytes(&raw[..end])
}

#[cfg(unix)]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    Path::new(std::ffi::OsStr::from_bytes(raw)).to_path_buf()
}

#[cfg(not(unix))]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    Path::new(&*String::from_utf8_lossy(raw)).to_path_buf()
}

fn bluetooth_family() -> [u8; 2] {
    (AddressFamily::Bluetooth.as_raw() as u16).to_ne_bytes()
}

#[cfg(not(windows))]
fn encode_bluetooth(device: BdAddr, rfcomm: bool, port: u32) -> Result<NativeAddress, SocketError> {
    let mut bytes = [0u8; 14];
    bytes[0..2].copy_from_slice(&bluetooth_family());
    if rfcomm {
        bytes[2..8].copy_from_slice(&device.to_le_bytes());
        bytes[8] = port as u8;
        NativeAddress::from_slice(&bytes[..10])
    } else {
        bytes[2..4].copy_from_slice(&(port as u16).to_le_bytes());
        bytes[4..10].copy_from_slice(&device.to_le_bytes());
        NativeAddress::from_slice(&bytes)
    }
}

#[cfg(windows)]
fn encode_bluetooth(device: BdAddr, _rfcomm: bool, port: u32) -> Result<NativeAddress, SocketError> {
    let mut bytes = [0u8; 30];
    bytes[0..2].copy_from_slice(&bluetooth_family());
    bytes[2..10].copy_from_slice(&device.to_u64().to_le_bytes());
    bytes[26..30].copy_from_slice(&port.to_le_bytes());
    NativeAddress::from_slice(&bytes)
}

#[cfg(not(windows))]
fn decode_bluetooth(bytes: &[u8], protocol: Protocol) -> Result<Address, SocketError> {
    let mut device = [0u8; 6];
    if protocol == Protocol::RFCOMM {
        if bytes.len() < 9 {
            return Err(short_bluetooth(bytes.len()));
        }
        device.copy_from_slice(&bytes[2..8]);
        Ok(Address::Rfcomm {
            device: BdAddr::from_le_bytes(device),
            channel: bytes[8],
        })
    } else {
        if bytes.len() < 10 {
            return Err(short_bluetooth(bytes.len()));
        }
        device.copy_from_slice(&bytes[4..10]);
        Ok(Address::L2cap {
            device: BdAddr::from_le_bytes(device),
            psm: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

#[cfg(windows)]
fn decode_bluetooth(bytes: &[u8], protocol: Protocol) -> Result<Address, SocketError> {
    if bytes.len() < 30 {
        return Err(short_bluetooth(bytes.len()));
    }
    let mut wide = [0u8; 8];
    wide.copy_from_slice(&bytes[2..10]);
    let device = BdAddr::from_u64(u64::from_le_bytes(wide));
    let port = u32::from_le_bytes([bytes[26], bytes[27], bytes[28], bytes[29]]);
    if protocol == Protocol::RFCOMM {
        Ok(Address::Rfcomm {
            device,
            channel: port as u8,
        })
    } else {
        Ok(Address::L2cap {
            device,
            psm: port as u16,
        })
    }
}

fn short_bluetooth(len: usize) -> SocketError {
    SocketError::InvalidArgument(format!("bluetooth address of {} bytes is truncated", len))
}

/// Leading decimal digits of `text`, 0 when there are none
fn leading_number(text: Option<&str>) -> u32 {
    let text = text.unwrap_or("").trim();
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return 0;
    }
    text[..digits].parse::<u32>().unwrap_or(u32::MAX)
}
