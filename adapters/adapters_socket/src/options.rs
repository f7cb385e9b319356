//! Socket Options Module
//!
//! A generic `setsockopt`/`getsockopt` pair over raw byte payloads and the
//! typed options built on it: address reuse, broadcast, buffer sizes and
//! TCP no-delay. Blocking mode is tracked on the handle.

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

use infrastructure_socket_errors::SocketError;
use socket2::Socket as Socket2;

use crate::socket::Socket;

#[cfg(unix)]
mod levels {
    pub const SOL_SOCKET: i32 = libc::SOL_SOCKET;
    pub const SO_REUSEADDR: i32 = libc::SO_REUSEADDR;
    pub const SO_BROADCAST: i32 = libc::SO_BROADCAST;
    pub const SO_RCVBUF: i32 = libc::SO_RCVBUF;
    pub const SO_SNDBUF: i32 = libc::SO_SNDBUF;
    pub const SO_KEEPALIVE: i32 = libc::SO_KEEPALIVE;
    pub const IPPROTO_TCP: i32 = libc::IPPROTO_TCP;
    pub const TCP_NODELAY: i32 = libc::TCP_NODELAY;
}

#[cfg(windows)]
mod levels {
    pub const SOL_SOCKET: i32 = 0xffff;
    pub const SO_REUSEADDR: i32 = 0x0004;
    pub const SO_BROADCAST: i32 = 0x0020;
    pub const SO_RCVBUF: i32 = 0x1002;
    pub const SO_SNDBUF: i32 = 0x1001;
    pub const SO_KEEPALIVE: i32 = 0x0008;
    pub const IPPROTO_TCP: i32 = 6;
    pub const TCP_NODELAY: i32 = 0x0001;
}

pub use levels::*;

impl Socket {
    /// Set a socket option from its raw payload
    ///
    /// # Arguments
    ///
    /// * `level` - Option level, e.g. [`SOL_SOCKET`]
    /// * `name` - Option name, e.g. [`SO_REUSEADDR`]
    /// * `value` - Native payload
    pub fn set_option(&mut self, level: i32, name: i32, value: &[u8]) -> Result<(), SocketError> {
        match self.descriptor_call("setsockopt", |s| sys::set(s, level, name, value))? {
            Ok(()) => {
                self.clear_last_error();
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Read a socket option's raw payload
    ///
    /// # Arguments
    ///
    /// * `level`, `name` - Option to read
    /// * `len` - Payload capacity
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Payload, truncated to the length the platform reported
    pub fn get_option(&mut self, level: i32, name: i32, len: usize) -> Result<Vec<u8>, SocketError> {
        match self.descriptor_call("getsockopt", |s| sys::get(s, level, name, len))? {
            Ok(value) => {
                self.clear_last_error();
                Ok(value)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Set an `int`-valued option
    pub fn set_int_option(&mut self, level: i32, name: i32, value: i32) -> Result<(), SocketError> {
        self.set_option(level, name, &value.to_ne_bytes())
    }

    /// Read an `int`-valued option
    ///
    /// Shorter payloads (some platforms report single-byte booleans) are
    /// zero-extended.
    pub fn int_option(&mut self, level: i32, name: i32) -> Result<i32, SocketError> {
        let raw = self.get_option(level, name, std::mem::size_of::<i32>())?;
        let mut bytes = [0u8; 4];
        bytes[..raw.len().min(4)].copy_from_slice(&raw[..raw.len().min(4)]);
        Ok(i32::from_ne_bytes(bytes))
    }

    /// Switch between blocking and non-blocking mode
    pub fn set_blocking(&mut self, blocking: bool) -> Result<(), SocketError> {
        match self.descriptor_call("set_blocking", |s| s.set_nonblocking(!blocking))? {
            Ok(()) => {
                self.non_blocking = !blocking;
                self.clear_last_error();
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Whether the handle is in blocking mode
    pub fn blocking(&self) -> bool {
        !self.non_blocking
    }

    pub fn set_reuse_addr(&mut self, enable: bool) -> Result<(), SocketError> {
        self.set_int_option(SOL_SOCKET, SO_REUSEADDR, i32::from(enable))
    }

    pub fn reuse_addr(&mut self) -> Result<bool, SocketError> {
        self.int_option(SOL_SOCKET, SO_REUSEADDR).map(|v| v != 0)
    }

    pub fn set_broadcast(&mut self, enable: bool) -> Result<(), SocketError> {
        self.set_int_option(SOL_SOCKET, SO_BROADCAST, i32::from(enable))
    }

    pub fn broadcast(&mut self) -> Result<bool, SocketError> {
        self.int_option(SOL_SOCKET, SO_BROADCAST).map(|v| v != 0)
    }

    /// Set the kernel receive buffer size
    pub fn set_recv_buffer_size(&mut self, size: usize) -> Result<(), SocketError> {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        self.set_int_option(SOL_SOCKET, SO_RCVBUF, size)
    }

    /// Kernel receive buffer size (Linux reports double the requested value)
    pub fn recv_buffer_size(&mut self) -> Result<usize, SocketError> {
        self.int_option(SOL_SOCKET, SO_RCVBUF).map(|v| v.max(0) as usize)
    }

    pub fn set_send_buffer_size(&mut self, size: usize) -> Result<(), SocketError> {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        self.set_int_option(SOL_SOCKET, SO_SNDBUF, size)
    }

    pub fn send_buffer_size(&mut self) -> Result<usize, SocketError> {
        self.int_option(SOL_SOCKET, SO_SNDBUF).map(|v| v.max(0) as usize)
    }

    /// Disable (or re-enable) Nagle's algorithm on TCP sockets
    pub fn set_nodelay(&mut self, enable: bool) -> Result<(), SocketError> {
        self.set_int_option(IPPROTO_TCP, TCP_NODELAY, i32::from(enable))
    }

    pub fn nodelay(&mut self) -> Result<bool, SocketError> {
        self.int_option(IPPROTO_TCP, TCP_NODELAY).map(|v| v != 0)
    }
}

#[cfg(unix)]
mod sys {
    use super::*;
    use std::os::unix::io::AsRawFd;

    pub(super) fn set(socket: &Socket2, level: i32, name: i32, value: &[u8]) -> io::Result<()> {
        // SAFETY: `value` is valid for `value.len()` bytes for the whole call.
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                level,
                name,
                value.as_ptr().cast(),
                value.len() as libc::socklen_t,
            )
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub(super) fn get(socket: &Socket2, level: i32, name: i32, len: usize) -> io::Result<Vec<u8>> {
        let mut value = vec![0u8; len];
        let mut optlen = len as libc::socklen_t;
        // SAFETY: `value` has room for `optlen` bytes and `optlen` is updated in place.
        let rc = unsafe {
            libc::getsockopt(
                socket.as_raw_fd(),
                level,
                name,
                value.as_mut_ptr().cast(),
                &mut optlen,
            )
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        value.truncate(optlen as usize);
        Ok(value)
    }
}

#[cfg(windows)]
mod sys {
    use super::*;
    use std::os::windows::io::AsRawSocket;
    use windows_sys::Win32::Networking::WinSock::{getsockopt, setsockopt, WSAGetLastError, SOCKET};

    pub(super) fn set(socket: &Socket2, level: i32, name: i32, value: &[u8]) -> io::Result<()> {
        // SAFETY: `value` is valid for `value.len()` bytes for the whole call.
        let rc = unsafe {
            setsockopt(
                socket.as_raw_socket() as SOCKET,
                level,
                name,
                value.as_ptr(),
                value.len() as i32,
            )
        };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(unsafe { WSAGetLastError() }));
        }
        Ok(())
    }

    pub(super) fn get(socket: &Socket2, level: i32, name: i32, len: usize) -> io::Result<Vec<u8>> {
        let mut value = vec![0u8; len];
        let mut optlen = len as i32;
        // SAFETY: `value` has room for `optlen` bytes and `optlen` is updated in place.
        let rc = unsafe {
            getsockopt(
                socket.as_raw_socket() as SOCKET,
                level,
                name,
                value.as_mut_ptr(),
                &mut optlen,
            )
        };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(unsafe { WSAGetLastError() }));
        }
        value.truncate(optlen.max(0) as usize);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities_socket::{AddressFamily, Protocol, SocketState, SocketType};

    fn tcp() -> Socket {
        Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap()
    }

    #[test]
    fn test_reuse_addr_roundtrip() {
        let mut socket = tcp();
        socket.set_reuse_addr(true).unwrap();
        assert!(socket.reuse_addr().unwrap());
        socket.set_reuse_addr(false).unwrap();
        assert!(!socket.reuse_addr().unwrap());
    }

    #[test]
    fn test_broadcast_on_udp() {
        let mut socket = Socket::open(AddressFamily::Inet, SocketType::Datagram, Protocol::UDP).unwrap();
        socket.set_broadcast(true).unwrap();
        assert!(socket.broadcast().unwrap());
    }

    #[test]
    fn test_nodelay() {
        let mut socket = tcp();
        socket.set_nodelay(true).unwrap();
        assert!(socket.nodelay().unwrap());
    }

    #[test]
    fn test_buffer_sizes_positive() {
        let mut socket = tcp();
        socket.set_recv_buffer_size(32 * 1024).unwrap();
        socket.set_send_buffer_size(32 * 1024).unwrap();
        assert!(socket.recv_buffer_size().unwrap() > 0);
        assert!(socket.send_buffer_size().unwrap() > 0);
    }

    #[test]
    fn test_keepalive_through_generic_option() {
        let mut socket = tcp();
        socket.set_int_option(SOL_SOCKET, SO_KEEPALIVE, 1).unwrap();
        assert_ne!(socket.int_option(SOL_SOCKET, SO_KEEPALIVE).unwrap(), 0);
        socket.set_int_option(SOL_SOCKET, SO_KEEPALIVE, 0).unwrap();
        assert_eq!(socket.int_option(SOL_SOCKET, SO_KEEPALIVE).unwrap(), 0);
        assert!(!socket.last_error().is_set());
    }

    #[test]
    fn test_blocking_flag_tracks_mode() {
        let mut socket = tcp();
        assert!(socket.blocking());
        socket.set_blocking(false).unwrap();
        assert!(!socket.blocking());
    }

    #[test]
    fn test_unknown_option_records_error() {
        let mut socket = tcp();
        let err = socket.set_int_option(SOL_SOCKET, 0x7fff_0000, 1).unwrap_err();
        assert!(err.code() > 0);
        assert_eq!(socket.last_error().code, err.code());
        assert_eq!(socket.state(), SocketState::Init);
    }

    #[test]
    fn test_options_on_closed_handle_fail_fast() {
        let mut socket = tcp();
        socket.close();
        assert!(matches!(
            socket.set_nodelay(true),
            Err(SocketError::InvalidState { .. })
        ));
    }
}
