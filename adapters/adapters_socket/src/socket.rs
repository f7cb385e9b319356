//! Socket Module
//!
//! The per-handle connection state machine. A [`Socket`] owns one platform
//! descriptor together with its family/type/protocol triple, cached local
//! and remote addresses, lifecycle state, blocking mode, connect timeout,
//! line-reader buffer and last error.
//!
//! ```text
//! INIT --bind--> BOUND --listen--> LISTENING --accept--> (new CONNECTED handle)
//! INIT/BOUND/CLOSED --connect--> CONNECTED --shutdown--> SHUTDOWN
//! any --close--> CLOSED          hard I/O failure --> ERROR
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

use std::fmt;
use std::io;
use std::net::Shutdown;
use std::path::Path;
use std::time::Duration;

use entities_socket::{Address, AddressFamily, AddressPurpose, Protocol, SocketState, SocketType};
use infrastructure_socket_errors::{is_in_progress, is_would_block, LastError, SocketError};
use socket2::{Domain, Protocol as Socket2Protocol, SockAddr, Socket as Socket2, Type};

use crate::address;
use crate::config::{SocketConfig, DEFAULT_TIMEOUT, LISTEN_BACKLOG_MAX};
use crate::line::LineBuffer;
use crate::readiness::{self, Interest};

/// Platform descriptor type
#[cfg(unix)]
pub type RawDescriptor = std::os::unix::io::RawFd;
#[cfg(windows)]
pub type RawDescriptor = std::os::windows::io::RawSocket;

/// Socket handle
///
/// All operations take `&mut self`; callers sharing a handle across threads
/// wrap it in a lock (see `infrastructure_handle_registry`).
#[derive(Debug)]
pub struct Socket {
    pub(crate) inner: Option<Socket2>,
    family: AddressFamily,
    socket_type: SocketType,
    protocol: Protocol,
    local: Option<Address>,
    pub(crate) remote: Option<Address>,
    pub(crate) state: SocketState,
    pub(crate) non_blocking: bool,
    timeout: Duration,
    /// This handle created the Unix path in `local` and must unlink it
    owns_path: bool,
    /// A connect attempt failed; the descriptor may still have it in flight
    stale_connect: bool,
    pub(crate) line: LineBuffer,
    last_error: LastError,
}

impl Socket {
    /// Open a descriptor without binding or connecting it
    ///
    /// # Arguments
    ///
    /// * `family` - Address family
    /// * `socket_type` - Socket type
    /// * `protocol` - Protocol number (0 lets the platform choose)
    ///
    /// # Returns
    ///
    /// * `Ok(Socket)` - Handle in state `INIT`, blocking, default timeout
    /// * `Err(SocketError)` - Error creating the descriptor
    pub fn open(family: AddressFamily, socket_type: SocketType, protocol: Protocol) -> Result<Self, SocketError> {
        let inner = open_descriptor(family, socket_type, protocol)?;
        tracing::debug!(%family, %socket_type, protocol = protocol.as_raw(), "socket opened");
        Ok(Self {
            inner: Some(inner),
            family,
            socket_type,
            protocol,
            local: None,
            remote: None,
            state: SocketState::Init,
            non_blocking: false,
            timeout: DEFAULT_TIMEOUT,
            owns_path: false,
            stale_connect: false,
            line: LineBuffer::new(),
            last_error: LastError::default(),
        })
    }

    /// Create a handle from a configuration record
    ///
    /// Applies the requested options, then binds, listens and connects as
    /// configured, and finally switches to non-blocking mode if requested.
    ///
    /// # Returns
    ///
    /// * `Ok(Socket)` - Configured handle
    /// * `Err(SocketError)` - First step that failed; the descriptor is released
    pub fn create(config: &SocketConfig) -> Result<Self, SocketError> {
        let mut socket = Self::open(config.family, config.socket_type, config.protocol)?;
        socket.timeout = config.timeout;
        if config.broadcast {
            socket.set_broadcast(true)?;
        }
        if config.reuse_addr {
            socket.set_reuse_addr(true)?;
        }
        if config.wants_bind() {
            socket.bind(config.local_host.as_deref(), config.local_service.as_deref())?;
        }
        if let Some(backlog) = config.listen {
            socket.listen(backlog)?;
        }
        if config.wants_connect() {
            socket.connect(
                config.remote_host.as_deref(),
                config.remote_service.as_deref(),
                None,
            )?;
        }
        if !config.blocking {
            socket.set_blocking(false)?;
        }
        Ok(socket)
    }

    /// Bind to a local address
    ///
    /// The address is resolved passively, so an absent host binds the
    /// wildcard and an absent service binds an ephemeral port. A stale Unix
    /// socket file at the path is removed first. A closed handle gets a
    /// fresh descriptor.
    pub fn bind(&mut self, host: Option<&str>, service: Option<&str>) -> Result<(), SocketError> {
        match self.state {
            SocketState::Init | SocketState::Bound => {}
            SocketState::Closed => self.reopen()?,
            _ => return self.invalid_state("bind"),
        }
        let target = match address::pack(
            self.family,
            self.socket_type,
            self.protocol,
            host,
            service,
            AddressPurpose::Listen,
        ) {
            Ok(target) => target,
            Err(e) => return self.fail(e),
        };
        let sock_addr = match address::to_sock_addr(&target) {
            Ok(sock_addr) => sock_addr,
            Err(e) => return self.fail(e),
        };
        if let Address::Unix(path) = &target {
            remove_socket_file(path);
        }
        if let Err(e) = self.descriptor_call("bind", |s| s.bind(&sock_addr))? {
            return self.fail(e.into());
        }
        self.owns_path = matches!(target, Address::Unix(_));
        self.local = self.query_local().or(Some(target));
        self.state = SocketState::Bound;
        tracing::debug!(local = ?self.local, "socket bound");
        self.clear_last_error();
        Ok(())
    }

    /// Start listening
    ///
    /// Negative backlogs and backlogs above the platform maximum use the
    /// maximum. An unbound stream socket listens on an ephemeral port.
    pub fn listen(&mut self, backlog: i32) -> Result<(), SocketError> {
        match self.state {
            SocketState::Init | SocketState::Bound => {}
            _ => return self.invalid_state("listen"),
        }
        let backlog = if !(0..=LISTEN_BACKLOG_MAX).contains(&backlog) {
            LISTEN_BACKLOG_MAX
        } else {
            backlog
        };
        if let Err(e) = self.descriptor_call("listen", |s| s.listen(backlog))? {
            return self.fail(e.into());
        }
        self.local = self.query_local().or_else(|| self.local.take());
        self.state = SocketState::Listening;
        tracing::debug!(backlog, local = ?self.local, "socket listening");
        self.clear_last_error();
        Ok(())
    }

    /// Accept one pending connection
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Socket))` - New, independent `CONNECTED` handle
    /// * `Ok(None)` - Non-blocking listener with nothing pending
    /// * `Err(SocketError)` - Hard failure; the listener moves to `ERROR`
    pub fn accept(&mut self) -> Result<Option<Socket>, SocketError> {
        if self.state != SocketState::Listening {
            return self.invalid_state("accept");
        }
        let (inner, peer) = match self.descriptor_call("accept", |s| s.accept())? {
            Ok(pair) => pair,
            Err(e) if is_would_block(&e) => {
                self.clear_last_error();
                return Ok(None);
            }
            Err(e) => return self.fail_hard("accept", e.into()),
        };
        if let Err(e) = inner.set_nonblocking(false) {
            tracing::debug!("accepted descriptor stays in inherited mode: {}", e);
        }
        let mut child = Socket {
            inner: Some(inner),
            family: self.family,
            socket_type: self.socket_type,
            protocol: self.protocol,
            local: None,
            remote: named(address::from_sock_addr(&peer, self.protocol).ok()),
            state: SocketState::Connected,
            non_blocking: false,
            timeout: self.timeout,
            owns_path: false,
            stale_connect: false,
            line: LineBuffer::new(),
            last_error: LastError::default(),
        };
        child.local = child.query_local();
        tracing::debug!(descriptor = ?child.descriptor(), remote = ?child.remote, "accepted connection");
        self.clear_last_error();
        Ok(Some(child))
    }

    /// Connect to a peer, bounded by the handle's timeout
    ///
    /// With neither host nor service the previously remembered remote address
    /// is used. A `CONNECTED` (or shut down / closed) handle first gets a
    /// fresh descriptor, as does one whose previous attempt failed or timed
    /// out (its local binding is dropped). A positive `timeout` replaces the
    /// handle's timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Connected; the local address is refreshed
    /// * `Err(SocketError::ConnectTimeout)` - Not writable within the timeout
    /// * `Err(SocketError)` - Resolution or connect failure
    pub fn connect(
        &mut self,
        host: Option<&str>,
        service: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<(), SocketError> {
        if matches!(self.state, SocketState::Listening | SocketState::Error) {
            return self.invalid_state("connect");
        }
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            self.timeout = timeout;
        }
        let target = if host.is_none() && service.is_none() {
            match self.remote.clone() {
                Some(target) => target,
                None => {
                    return self.fail(SocketError::InvalidArgument(
                        "no remote address".to_string(),
                    ))
                }
            }
        } else {
            match address::pack(
                self.family,
                self.socket_type,
                self.protocol,
                host,
                service,
                AddressPurpose::Connect,
            ) {
                Ok(target) => target,
                Err(e) => return self.fail(e),
            }
        };
        let sock_addr = match address::to_sock_addr(&target) {
            Ok(sock_addr) => sock_addr,
            Err(e) => return self.fail(e),
        };
        if self.inner.is_none()
            || self.stale_connect
            || matches!(
                self.state,
                SocketState::Connected | SocketState::ShutDown | SocketState::Closed
            )
        {
            self.reopen()?;
        }

        tracing::debug!(remote = %target, timeout = ?self.timeout, "connecting");
        let (timeout, non_blocking) = (self.timeout, self.non_blocking);
        let outcome = match self.inner.as_ref() {
            Some(inner) => connect_with_timeout(inner, &sock_addr, timeout, non_blocking),
            None => Err(SocketError::InvalidState {
                operation: "connect",
                state: self.state,
            }),
        };
        if let Err(e) = outcome {
            tracing::debug!("connect failed: {}", e);
            self.stale_connect = true;
            return self.fail(e);
        }
        self.remote = Some(target);
        self.local = self.query_local();
        self.state = SocketState::Connected;
        self.stale_connect = false;
        self.line.reset();
        self.clear_last_error();
        Ok(())
    }

    /// Shut down one or both directions
    pub fn shutdown(&mut self, how: Shutdown) -> Result<(), SocketError> {
        if !matches!(self.state, SocketState::Connected | SocketState::ShutDown) {
            return self.invalid_state("shutdown");
        }
        if let Err(e) = self.descriptor_call("shutdown", |s| s.shutdown(how))? {
            return self.fail_hard("shutdown", e.into());
        }
        self.state = SocketState::ShutDown;
        self.clear_last_error();
        Ok(())
    }

    /// Release the descriptor
    ///
    /// Clears the cached addresses and unlinks a Unix path this handle bound.
    /// Closing an already closed handle does nothing.
    pub fn close(&mut self) {
        if self.inner.is_some() {
            tracing::debug!(descriptor = ?self.descriptor(), "closing socket");
        }
        self.release_descriptor();
        self.local = None;
        self.remote = None;
        self.state = SocketState::Closed;
        self.line.reset();
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Cached local address
    pub fn local_addr(&self) -> Option<&Address> {
        self.local.as_ref()
    }

    /// Cached remote address (the peer of the last `sendto`/`recvfrom` on
    /// unconnected datagram sockets)
    pub fn remote_addr(&self) -> Option<&Address> {
        self.remote.as_ref()
    }

    /// Platform descriptor, `None` once closed
    #[cfg(unix)]
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        use std::os::unix::io::AsRawFd;
        self.inner.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Platform descriptor, `None` once closed
    #[cfg(windows)]
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        use std::os::windows::io::AsRawSocket;
        self.inner.as_ref().map(AsRawSocket::as_raw_socket)
    }

    /// Timeout bounding connects
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Most recent failure on this handle
    pub fn last_error(&self) -> &LastError {
        &self.last_error
    }

    /// Overwrite the last-error record
    pub fn set_last_error(&mut self, error: LastError) {
        self.last_error = error;
    }

    /// Reset the last-error record to "no error"
    pub fn clear_last_error(&mut self) {
        self.last_error.clear();
    }

    /// Record `err` as the last error and return it
    pub(crate) fn fail<T>(&mut self, err: SocketError) -> Result<T, SocketError> {
        self.last_error = LastError::from(&err);
        Err(err)
    }

    /// Record a hard failure: the handle moves to `ERROR`
    pub(crate) fn fail_hard<T>(&mut self, operation: &'static str, err: SocketError) -> Result<T, SocketError> {
        tracing::debug!(operation, code = err.code(), "{} error: {}", operation, err);
        self.state = SocketState::Error;
        self.fail(err)
    }

    pub(crate) fn invalid_state<T>(&mut self, operation: &'static str) -> Result<T, SocketError> {
        let state = self.state;
        self.fail(SocketError::InvalidState { operation, state })
    }

    /// Run `call` on the descriptor
    ///
    /// Fails without touching the descriptor when the handle is closed or in
    /// `ERROR`.
    pub(crate) fn descriptor_call<R>(
        &mut self,
        operation: &'static str,
        call: impl FnOnce(&Socket2) -> io::Result<R>,
    ) -> Result<io::Result<R>, SocketError> {
        if self.state != SocketState::Error {
            if let Some(inner) = self.inner.as_ref() {
                return Ok(call(inner));
            }
        }
        self.invalid_state(operation)
    }

    fn query_local(&self) -> Option<Address> {
        let sock_addr = self.inner.as_ref()?.local_addr().ok()?;
        named(address::from_sock_addr(&sock_addr, self.protocol).ok())
    }

    fn reopen(&mut self) -> Result<(), SocketError> {
        self.release_descriptor();
        let inner = match open_descriptor(self.family, self.socket_type, self.protocol) {
            Ok(inner) => inner,
            Err(e) => return self.fail(e),
        };
        if self.non_blocking {
            if let Err(e) = inner.set_nonblocking(true) {
                return self.fail(e.into());
            }
        }
        self.inner = Some(inner);
        self.local = None;
        self.state = SocketState::Init;
        self.stale_connect = false;
        self.line.reset();
        Ok(())
    }

    fn release_descriptor(&mut self) {
        self.inner = None;
        if self.owns_path {
            if let Some(Address::Unix(path)) = &self.local {
                remove_socket_file(path);
            }
            self.owns_path = false;
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.release_descriptor();
    }
}

impl fmt::Display for Socket {
    /// `SOCKET(ID=<descriptor|NONE>;DOMAIN=..;TYPE=..;PROTO=..[;LOCAL=..][;REMOTE=..])`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SOCKET(ID=")?;
        match self.descriptor() {
            Some(descriptor) => write!(f, "{}", descriptor)?,
            None => f.write_str("NONE")?,
        }
        write!(
            f,
            ";DOMAIN={};TYPE={};PROTO={}",
            self.family,
            self.socket_type,
            self.protocol.name(self.family)
        )?;
        if let Some(local) = &self.local {
            write!(f, ";LOCAL={}", local)?;
        }
        if let Some(remote) = &self.remote {
            write!(f, ";REMOTE={}", remote)?;
        }
        f.write_str(")")
    }
}

fn open_descriptor(family: AddressFamily, socket_type: SocketType, protocol: Protocol) -> Result<Socket2, SocketError> {
    Socket2::new(
        Domain::from(family.as_raw()),
        Type::from(socket_type.as_raw()),
        Some(Socket2Protocol::from(protocol.as_raw())),
    )
    .map_err(SocketError::from)
}

fn connect_with_timeout(
    inner: &Socket2,
    addr: &SockAddr,
    timeout: Duration,
    non_blocking: bool,
) -> Result<(), SocketError> {
    if !non_blocking {
        inner.set_nonblocking(true)?;
    }
    let result = match inner.connect(addr) {
        Ok(()) => Ok(()),
        Err(e) if is_in_progress(&e) => await_connect(inner, timeout),
        Err(e) => Err(SocketError::from(e)),
    };
    if !non_blocking {
        inner.set_nonblocking(false)?;
    }
    result
}

fn await_connect(inner: &Socket2, timeout: Duration) -> Result<(), SocketError> {
    let ready = readiness::wait(inner, Interest::WRITE, Some(timeout))?;
    if !ready.writable {
        return Err(SocketError::connect_timeout());
    }
    match inner.take_error()? {
        Some(e) => Err(SocketError::from(e)),
        None => Ok(()),
    }
}

/// Drop unnamed Unix addresses (empty path)
pub(crate) fn named(address: Option<Address>) -> Option<Address> {
    match address {
        Some(Address::Unix(path)) if path.as_os_str().is_empty() => None,
        other => other,
    }
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed socket file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "cannot remove socket file: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn loopback_listener() -> Socket {
        let config = SocketConfig::default()
            .with_local(Some("127.0.0.1"), None)
            .with_listen(8);
        Socket::create(&config).unwrap()
    }

    fn port_of(socket: &Socket) -> String {
        socket.local_addr().unwrap().service()
    }

    #[test]
    fn test_open_is_init() {
        let socket = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        assert_eq!(socket.state(), SocketState::Init);
        assert!(socket.descriptor().is_some());
        assert_eq!(socket.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_bind_ephemeral_port_refreshes_local() {
        let mut socket = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        socket.bind(Some("127.0.0.1"), None).unwrap();
        assert_eq!(socket.state(), SocketState::Bound);
        let local = socket.local_addr().unwrap();
        assert_eq!(local.host(), "127.0.0.1");
        assert_ne!(local.service(), "0");
    }

    #[test]
    fn test_listen_connect_accept() {
        let mut listener = loopback_listener();
        assert_eq!(listener.state(), SocketState::Listening);
        let port = port_of(&listener);

        let client = thread::spawn(move || {
            let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
            client.connect(Some("127.0.0.1"), Some(&port), None).unwrap();
            assert_eq!(client.state(), SocketState::Connected);
            assert!(client.local_addr().is_some());
            client
        });

        let child = listener.accept().unwrap().unwrap();
        let client = client.join().unwrap();
        assert_eq!(child.state(), SocketState::Connected);
        assert_eq!(child.family(), AddressFamily::Inet);
        assert_eq!(child.remote_addr(), client.local_addr());
        assert_eq!(listener.state(), SocketState::Listening);
    }

    #[test]
    fn test_accept_requires_listening() {
        let mut socket = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        let err = socket.accept().unwrap_err();
        assert!(matches!(err, SocketError::InvalidState { operation: "accept", .. }));
        assert_eq!(socket.last_error().code, -1);
    }

    #[test]
    fn test_non_blocking_accept_without_pending() {
        let config = SocketConfig::default()
            .with_local(Some("127.0.0.1"), None)
            .with_listen(4)
            .with_blocking(false);
        let mut listener = Socket::create(&config).unwrap();
        assert!(listener.accept().unwrap().is_none());
        assert_eq!(listener.state(), SocketState::Listening);
        assert!(!listener.last_error().is_set());
    }

    #[test]
    fn test_close_clears_addresses() {
        let mut listener = loopback_listener();
        listener.close();
        assert_eq!(listener.state(), SocketState::Closed);
        assert!(listener.local_addr().is_none());
        assert!(listener.descriptor().is_none());
        assert!(listener.to_string().starts_with("SOCKET(ID=NONE;DOMAIN=INET;TYPE=STREAM;PROTO=TCP"));
        listener.close();
        assert_eq!(listener.state(), SocketState::Closed);
    }

    #[test]
    fn test_display_includes_local() {
        let listener = loopback_listener();
        let text = listener.to_string();
        assert!(text.contains(";LOCAL=127.0.0.1:"), "{}", text);
        assert!(!text.contains("REMOTE"));
        assert!(text.ends_with(')'));
    }

    #[test]
    fn test_connect_refused_keeps_state() {
        let port = {
            let listener = loopback_listener();
            port_of(&listener)
        };
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        let err = client
            .connect(Some("127.0.0.1"), Some(&port), Some(Duration::from_secs(2)))
            .unwrap_err();
        assert!(err.code() > 0);
        assert_eq!(client.state(), SocketState::Init);
        assert_eq!(client.last_error().code, err.code());
    }

    #[test]
    fn test_connect_without_target_needs_remote() {
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        assert!(matches!(
            client.connect(None, None, None),
            Err(SocketError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_connect_timeout_updates_handle_timeout() {
        let mut listener = loopback_listener();
        let port = port_of(&listener);
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        client
            .connect(Some("127.0.0.1"), Some(&port), Some(Duration::from_millis(1500)))
            .unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(1500));
        let _child = listener.accept().unwrap();
    }

    #[test]
    fn test_reconnect_replaces_descriptor() {
        let mut listener = loopback_listener();
        let port = port_of(&listener);
        let mut client = Socket::open(AddressFamily::Inet, SocketType::Stream, Protocol::TCP).unwrap();
        client.connect(Some("127.0.0.1"), Some(&port), None).unwrap();
        let first_local = client.local_addr().cloned();
        let _first = listener.accept().unwrap().unwrap();

        client.connect(None, None, None).unwrap();
        let _second = listener.accept().unwrap().unwrap();
        assert_eq!(client.state(), SocketState::Connected);
        assert_ne!(client.local_addr().cloned(), first_local);
    }

    #[test]
    fn test_listen_rejected_when_listening() {
        let mut listener = loopback_listener();
        assert!(matches!(
            listener.listen(5),
            Err(SocketError::InvalidState { operation: "listen", .. })
        ));
    }
}
