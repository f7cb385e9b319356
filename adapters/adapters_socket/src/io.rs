//! Buffered I/O Module
//!
//! Data transfer on a [`Socket`]: flag-carrying send/receive, datagram
//! send-to/receive-from with peer memory, line reading, pending-byte counts
//! and readiness waits.
//!
//! Shared conventions:
//! - "would block" is not an error: the call succeeds with zero bytes (or an
//!   empty line) and clears the handle's last error
//! - a zero-byte transfer on a stream socket that was asked to move data is
//!   reported as a connection reset
//! - any other failure is hard: the handle moves to `ERROR` and later I/O
//!   fails fast until it is closed or reconnected

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
use std::io::{self, Read, Write};
use std::time::Duration;

use entities_socket::{Address, SocketState, SocketType};
use infrastructure_socket_errors::{is_would_block, SocketError};
use socket2::SockAddr;

use crate::address;
use crate::line::{as_uninit, DescriptorSource, LineOutcome};
use crate::readiness::{self, Interest, Readiness};
use crate::socket::{named, Socket};

impl Socket {
    /// Send bytes
    ///
    /// On an unconnected datagram socket the peer remembered by the last
    /// [`Socket::send_to`] or [`Socket::recv_from`] is used.
    ///
    /// # Arguments
    ///
    /// * `buf` - Bytes to send
    /// * `flags` - Platform `MSG_*` flags
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Bytes sent (0 when the call would block)
    /// * `Err(SocketError)` - Hard failure; the handle moves to `ERROR`
    pub fn send(&mut self, buf: &[u8], flags: i32) -> Result<usize, SocketError> {
        let peer = self.datagram_peer()?;
        let result = self.descriptor_call("send", |s| match &peer {
            Some(addr) => s.send_to_with_flags(buf, addr, flags),
            None => s.send_with_flags(buf, flags),
        })?;
        self.finish_transfer("send", result, !buf.is_empty())
    }

    /// Receive bytes
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Bytes received (0 when the call would block)
    /// * `Err(SocketError::ConnectionReset)` - Stream peer closed the connection
    /// * `Err(SocketError)` - Hard failure; the handle moves to `ERROR`
    pub fn recv(&mut self, buf: &mut [u8], flags: i32) -> Result<usize, SocketError> {
        let wanted = !buf.is_empty();
        let result = self.descriptor_call("recv", |s| s.recv_with_flags(as_uninit(buf), flags))?;
        self.finish_transfer("recv", result, wanted)
    }

    /// Send a datagram to `peer`, or to the remembered peer when `None`
    ///
    /// The peer is remembered for later calls without an explicit peer.
    pub fn send_to(&mut self, buf: &[u8], flags: i32, peer: Option<&Address>) -> Result<usize, SocketError> {
        let target = match peer.cloned().or_else(|| self.remote.clone()) {
            Some(target) => target,
            None => return self.fail(SocketError::InvalidArgument("no peer address".to_string())),
        };
        let addr = match address::to_sock_addr(&target) {
            Ok(addr) => addr,
            Err(e) => return self.fail(e),
        };
        self.remote = Some(target);
        let result = self.descriptor_call("sendto", |s| s.send_to_with_flags(buf, &addr, flags))?;
        self.finish_transfer("sendto", result, !buf.is_empty())
    }

    /// Receive a datagram and the address it came from
    ///
    /// The sender becomes the remembered peer.
    ///
    /// # Returns
    ///
    /// * `Ok((usize, Option<Address>))` - Bytes received and sender; `(0, None)`
    ///   when the call would block
    pub fn recv_from(&mut self, buf: &mut [u8], flags: i32) -> Result<(usize, Option<Address>), SocketError> {
        let wanted = !buf.is_empty();
        let result =
            self.descriptor_call("recvfrom", |s| s.recv_from_with_flags(as_uninit(buf), flags))?;
        match result {
            Ok((0, _)) if wanted && self.socket_type() == SocketType::Stream => {
                self.fail_hard("recvfrom", SocketError::connection_reset())
            }
            Ok((n, from)) => {
                let from = named(address::from_sock_addr(&from, self.protocol()).ok());
                if from.is_some() {
                    self.remote = from.clone();
                }
                self.clear_last_error();
                Ok((n, from))
            }
            Err(e) if is_would_block(&e) => {
                self.clear_last_error();
                Ok((0, None))
            }
            Err(e) => self.fail_hard("recvfrom", e.into()),
        }
    }

    /// [`Socket::recv`] without flags
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.recv(buf, 0)
    }

    /// [`Socket::send`] without flags
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        self.send(buf, 0)
    }

    /// Write `buf` followed by CR LF
    pub fn writeln(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        let mut line = Vec::with_capacity(buf.len() + 2);
        line.extend_from_slice(buf);
        line.extend_from_slice(b"\r\n");
        self.write(&line)
    }

    /// Format and write, e.g. `socket.write_formatted(format_args!("{} {}", a, b))`
    pub fn write_formatted(&mut self, args: fmt::Arguments<'_>) -> Result<usize, SocketError> {
        let text = fmt::format(args);
        self.write(text.as_bytes())
    }

    /// Read one line
    ///
    /// The line ends at CR, LF, CR LF or NUL; the delimiter is consumed but
    /// not returned. When the connection has no delimiter queued, the bytes
    /// available so far are returned as the line.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Line bytes (empty when the call would block)
    /// * `Err(SocketError::ConnectionReset)` - Peer closed with nothing pending
    /// * `Err(SocketError)` - Hard failure; the handle moves to `ERROR`
    pub fn readline(&mut self) -> Result<Vec<u8>, SocketError> {
        if self.state == SocketState::Error || self.inner.is_none() {
            return self.invalid_state("readline");
        }
        let outcome = match self.inner.as_ref() {
            Some(inner) => self.line.read_line(&mut DescriptorSource(inner)),
            None => Ok(LineOutcome::Closed),
        };
        match outcome {
            Ok(LineOutcome::Line(n)) | Ok(LineOutcome::Partial(n)) => {
                self.clear_last_error();
                Ok(self.line.line(n).to_vec())
            }
            Ok(LineOutcome::WouldBlock) => {
                self.clear_last_error();
                Ok(Vec::new())
            }
            Ok(LineOutcome::Closed) => self.fail_hard("readline", SocketError::connection_reset()),
            Err(e) => self.fail_hard("readline", e.into()),
        }
    }

    /// Number of bytes queued for reading
    ///
    /// Never blocks: with nothing queued the result is 0.
    pub fn available(&mut self) -> Result<usize, SocketError> {
        let ready = self.descriptor_call("available", |s| {
            readiness::wait(s, Interest::READ, Some(Duration::ZERO))
        })?;
        match ready {
            Ok(ready) if !ready.readable => {
                self.clear_last_error();
                return Ok(0);
            }
            Ok(_) => {}
            Err(e) => return self.fail_hard("available", e.into()),
        }
        let size = self.recv_buffer_size()?.max(1);
        let mut scratch = vec![0u8; size];
        let result = self.descriptor_call("available", |s| s.peek(as_uninit(&mut scratch)))?;
        self.finish_transfer("available", result, true)
    }

    /// Wait until data can be read
    ///
    /// `None` waits indefinitely.
    pub fn is_readable(&mut self, timeout: Option<Duration>) -> Result<bool, SocketError> {
        self.select(Interest::READ, timeout).map(|r| r.readable)
    }

    /// Wait until data can be written
    pub fn is_writable(&mut self, timeout: Option<Duration>) -> Result<bool, SocketError> {
        self.select(Interest::WRITE, timeout).map(|r| r.writable)
    }

    /// Wait for any of the conditions in `interest`
    ///
    /// # Returns
    ///
    /// * `Ok(Readiness)` - Conditions that became ready (none on timeout)
    /// * `Err(SocketError)` - Polling failed; the handle moves to `ERROR`
    pub fn select(&mut self, interest: Interest, timeout: Option<Duration>) -> Result<Readiness, SocketError> {
        match self.descriptor_call("select", |s| readiness::wait(s, interest, timeout))? {
            Ok(ready) => {
                self.clear_last_error();
                Ok(ready)
            }
            Err(e) => self.fail_hard("select", e.into()),
        }
    }

    /// Peer for sends on an unconnected datagram socket
    fn datagram_peer(&mut self) -> Result<Option<SockAddr>, SocketError> {
        if self.socket_type() == SocketType::Stream || self.state == SocketState::Connected {
            return Ok(None);
        }
        match self.remote.clone() {
            Some(remote) => match address::to_sock_addr(&remote) {
                Ok(addr) => Ok(Some(addr)),
                Err(e) => self.fail(e),
            },
            None => Ok(None),
        }
    }

    fn finish_transfer(
        &mut self,
        operation: &'static str,
        result: io::Result<usize>,
        wanted: bool,
    ) -> Result<usize, SocketError> {
        match result {
            Ok(0) if wanted && self.socket_type() == SocketType::Stream => {
                self.fail_hard(operation, SocketError::connection_reset())
            }
            Ok(n) => {
                self.clear_last_error();
                Ok(n)
            }
            Err(e) if is_would_block(&e) => {
                self.clear_last_error();
                Ok(0)
            }
            Err(e) => self.fail_hard(operation, e.into()),
        }
    }
}

/// Plain `std::io` access to the descriptor
///
/// These follow `std::io` conventions (would-block is an error, end of
/// stream is `Ok(0)`) and leave the handle's state untouched.
impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.as_ref().ok_or_else(not_connected)?;
        inner.read(buf)
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.as_ref().ok_or_else(not_connected)?;
        inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn not_connected() -> io::Error {
    io::Error::from(io::ErrorKind::NotConnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocketConfig;
    use entities_socket::AddressFamily;
    use std::thread;

    fn connected_pair() -> (Socket, Socket) {
        let config = SocketConfig::default()
            .with_local(Some("127.0.0.1"), None)
            .with_listen(4);
        let mut listener = Socket::create(&config).unwrap();
        let port = listener.local_addr().unwrap().service();
        let client = thread::spawn(move || {
            Socket::create(&SocketConfig::default().with_remote(Some("127.0.0.1"), Some(&port)))
                .unwrap()
        });
        let server = listener.accept().unwrap().unwrap();
        (client.join().unwrap(), server)
    }

    #[test]
    fn test_send_recv() {
        let (mut client, mut server) = connected_pair();
        assert_eq!(client.send(b"hello", 0).unwrap(), 5);
        let mut buf = [0u8; 16];
        let n = server.recv(&mut buf, 0).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_writeln_appends_crlf() {
        let (mut client, mut server) = connected_pair();
        assert_eq!(client.writeln(b"abc").unwrap(), 5);
        let mut buf = [0u8; 5];
        let mut got = 0;
        while got < 5 {
            got += server.read(&mut buf[got..]).unwrap();
        }
        assert_eq!(&buf, b"abc\r\n");
    }

    #[test]
    fn test_write_formatted_and_readline() {
        let (mut client, mut server) = connected_pair();
        client
            .write_formatted(format_args!("{}={}\n", "answer", 42))
            .unwrap();
        assert!(server.is_readable(Some(Duration::from_secs(2))).unwrap());
        assert_eq!(server.readline().unwrap(), b"answer=42");
    }

    #[test]
    fn test_peer_close_is_connection_reset() {
        let (mut client, mut server) = connected_pair();
        client.close();
        let mut buf = [0u8; 8];
        let err = server.recv(&mut buf, 0).unwrap_err();
        assert!(matches!(err, SocketError::ConnectionReset { .. }));
        assert_eq!(server.state(), SocketState::Error);
        assert!(matches!(
            server.recv(&mut buf, 0),
            Err(SocketError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_non_blocking_recv_without_data() {
        let (_client, mut server) = connected_pair();
        server.set_blocking(false).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(server.recv(&mut buf, 0).unwrap(), 0);
        assert_eq!(server.readline().unwrap(), Vec::<u8>::new());
        assert_eq!(server.state(), SocketState::Connected);
        assert!(!server.last_error().is_set());
    }

    #[test]
    fn test_available_counts_without_consuming() {
        let (mut client, mut server) = connected_pair();
        assert_eq!(server.available().unwrap(), 0);
        client.write(b"12345").unwrap();
        assert!(server.is_readable(Some(Duration::from_secs(2))).unwrap());
        let mut pending = server.available().unwrap();
        while pending < 5 {
            thread::sleep(Duration::from_millis(10));
            pending = server.available().unwrap();
        }
        assert_eq!(pending, 5);
        let mut buf = [0u8; 5];
        assert_eq!(server.read(&mut buf).unwrap(), 5);
    }

    #[test]
    fn test_success_clears_previous_error() {
        let bind_local = SocketConfig::udp(AddressFamily::Inet).with_local(Some("127.0.0.1"), None);
        let mut a = Socket::create(&bind_local).unwrap();
        let mut b = Socket::create(&bind_local).unwrap();
        let a_addr = a.local_addr().cloned().unwrap();

        let err = b.send_to(b"ping", 0, None).unwrap_err();
        assert!(matches!(err, SocketError::InvalidArgument(_)));
        assert!(b.last_error().is_set());

        assert_eq!(b.send_to(b"ping", 0, Some(&a_addr)).unwrap(), 4);
        assert!(!b.last_error().is_set());

        let mut buf = [0u8; 16];
        assert!(a.is_readable(Some(Duration::from_secs(2))).unwrap());
        assert_eq!(a.recv_from(&mut buf, 0).unwrap().0, 4);
        assert!(!a.last_error().is_set());
    }

    #[test]
    fn test_udp_peer_memory() {
        let bind_local = SocketConfig::udp(AddressFamily::Inet).with_local(Some("127.0.0.1"), None);
        let mut a = Socket::create(&bind_local).unwrap();
        let mut b = Socket::create(&bind_local).unwrap();
        let a_addr = a.local_addr().cloned().unwrap();
        let b_addr = b.local_addr().cloned().unwrap();

        b.send_to(b"ping", 0, Some(&a_addr)).unwrap();
        let mut buf = [0u8; 16];
        assert!(a.is_readable(Some(Duration::from_secs(2))).unwrap());
        let (n, from) = a.recv_from(&mut buf, 0).unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from.as_ref(), Some(&b_addr));
        assert_eq!(a.remote_addr(), Some(&b_addr));

        // Reply without naming the peer.
        a.write(b"pong").unwrap();
        assert!(b.is_readable(Some(Duration::from_secs(2))).unwrap());
        let (n, _) = b.recv_from(&mut buf, 0).unwrap();
        assert_eq!(&buf[..n], b"pong");
    }

    #[test]
    fn test_send_to_without_peer() {
        let mut socket = Socket::create(&SocketConfig::udp(AddressFamily::Inet)).unwrap();
        assert!(matches!(
            socket.send_to(b"x", 0, None),
            Err(SocketError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_std_io_traits() {
        let (mut client, mut server) = connected_pair();
        Write::write_all(&mut client, b"std").unwrap();
        let mut buf = [0u8; 3];
        Read::read_exact(&mut server, &mut buf).unwrap();
        assert_eq!(&buf, b"std");
    }
}
