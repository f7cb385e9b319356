//! Socket Facades
//!
//! [`SocketManager`] owns every live socket handle and exposes the socket
//! operation set addressed by [`HandleId`]. A stale identity is an ordinary
//! `UnknownHandle` error, recorded in the process-wide last-error slot.

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
use std::net::Shutdown;
use std::time::Duration;

use adapters_socket::{resolver, Interest, LookupHints, RawDescriptor, Readiness, ResolvedAddress, Socket, SocketConfig};
use entities_socket::{Address, HandleId, SocketState};
use infrastructure_handle_registry::{HandleRegistry, SharedHandle};
use infrastructure_socket_errors::{clear_global_error, global_last_error, set_global_error, set_global_last_error, LastError, SocketError};
use lazy_static::lazy_static;

lazy_static! {
    static ref GLOBAL_SOCKETS: SocketManager = SocketManager::new();
}

/// Process-wide socket manager
pub fn global() -> &'static SocketManager {
    &GLOBAL_SOCKETS
}

/// Block the calling thread for `ms` milliseconds (fractions allowed)
///
/// Zero and negative values return immediately.
///
/// # Returns
///
/// * `Ok(())` - Slept for the interval
/// * `Err(SocketError::InvalidArgument)` - NaN, infinite or too large for a
///   [`Duration`] (also recorded process-wide)
pub fn sleep(ms: f64) -> Result<(), SocketError> {
    if ms <= 0.0 {
        return Ok(());
    }
    match Duration::try_from_secs_f64(ms / 1000.0) {
        Ok(interval) => {
            std::thread::sleep(interval);
            Ok(())
        }
        Err(_) => Err(global_failure(SocketError::InvalidArgument(format!(
            "sleep interval {} ms out of range",
            ms
        )))),
    }
}

/// Registry of live socket handles and the operations on them
///
/// Each operation takes the registry lock only long enough to find the
/// handle, then works under that handle's own lock, so operations on
/// different handles run in parallel.
pub struct SocketManager {
    registry: HandleRegistry<Socket>,
}

impl SocketManager {
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
        }
    }

    /// Create and register a handle
    ///
    /// # Arguments
    ///
    /// * `config` - Creation record
    ///
    /// # Returns
    ///
    /// * `Ok(HandleId)` - Identity of the new handle
    /// * `Err(SocketError)` - Creation failed (also recorded process-wide)
    pub fn create(&self, config: &SocketConfig) -> Result<HandleId, SocketError> {
        let socket = Socket::create(config).map_err(global_failure)?;
        self.register(socket)
    }

    /// Create a handle from string key/value pairs
    pub fn create_from_pairs<I, K, V>(&self, pairs: I) -> Result<HandleId, SocketError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.create(&SocketConfig::from_pairs(pairs))
    }

    /// Create a handle from a flat `key, value, ...` list
    pub fn create_from_args(&self, args: &[&str]) -> Result<HandleId, SocketError> {
        let config = SocketConfig::from_args(args).map_err(global_failure)?;
        self.create(&config)
    }

    /// Close a handle and forget its identity
    pub fn destroy(&self, id: HandleId) -> Result<(), SocketError> {
        let handle = self.registry.remove(id).ok_or_else(|| unknown(id))?;
        handle.lock().close();
        tracing::debug!(%id, "socket destroyed");
        Ok(())
    }

    pub fn bind(&self, id: HandleId, host: Option<&str>, service: Option<&str>) -> Result<(), SocketError> {
        self.call(id, |s| s.bind(host, service))
    }

    pub fn listen(&self, id: HandleId, backlog: i32) -> Result<(), SocketError> {
        self.call(id, |s| s.listen(backlog))
    }

    /// Accept a pending connection on a listening handle
    ///
    /// # Returns
    ///
    /// * `Ok(Some(HandleId))` - Identity of the new connected handle
    /// * `Ok(None)` - Non-blocking listener with nothing pending
    /// * `Err(SocketError)` - Accept failed; the listener moves to `ERROR`
    pub fn accept(&self, id: HandleId) -> Result<Option<HandleId>, SocketError> {
        match self.call(id, Socket::accept)? {
            Some(child) => self.register(child).map(Some),
            None => Ok(None),
        }
    }

    /// Connect, optionally replacing the handle's timeout
    pub fn connect(
        &self,
        id: HandleId,
        host: Option<&str>,
        service: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<(), SocketError> {
        self.call(id, |s| s.connect(host, service, timeout))
    }

    pub fn shutdown(&self, id: HandleId, how: Shutdown) -> Result<(), SocketError> {
        self.call(id, |s| s.shutdown(how))
    }

    /// Close the descriptor but keep the identity (it can reconnect)
    pub fn close(&self, id: HandleId) -> Result<(), SocketError> {
        self.call(id, |s| {
            s.close();
            Ok(())
        })
    }

    pub fn send(&self, id: HandleId, buf: &[u8], flags: i32) -> Result<usize, SocketError> {
        self.call(id, |s| s.send(buf, flags))
    }

    pub fn recv(&self, id: HandleId, buf: &mut [u8], flags: i32) -> Result<usize, SocketError> {
        self.call(id, |s| s.recv(buf, flags))
    }

    pub fn send_to(&self, id: HandleId, buf: &[u8], flags: i32, peer: Option<&Address>) -> Result<usize, SocketError> {
        self.call(id, |s| s.send_to(buf, flags, peer))
    }

    pub fn recv_from(
        &self,
        id: HandleId,
        buf: &mut [u8],
        flags: i32,
    ) -> Result<(usize, Option<Address>), SocketError> {
        self.call(id, |s| s.recv_from(buf, flags))
    }

    pub fn read(&self, id: HandleId, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.call(id, |s| s.read(buf))
    }

    pub fn write(&self, id: HandleId, buf: &[u8]) -> Result<usize, SocketError> {
        self.call(id, |s| s.write(buf))
    }

    pub fn writeln(&self, id: HandleId, buf: &[u8]) -> Result<usize, SocketError> {
        self.call(id, |s| s.writeln(buf))
    }

    pub fn write_formatted(&self, id: HandleId, args: fmt::Arguments<'_>) -> Result<usize, SocketError> {
        self.call(id, |s| s.write_formatted(args))
    }

    pub fn readline(&self, id: HandleId) -> Result<Vec<u8>, SocketError> {
        self.call(id, Socket::readline)
    }

    pub fn available(&self, id: HandleId) -> Result<usize, SocketError> {
        self.call(id, Socket::available)
    }

    pub fn is_readable(&self, id: HandleId, timeout: Option<Duration>) -> Result<bool, SocketError> {
        self.call(id, |s| s.is_readable(timeout))
    }

    pub fn is_writable(&self, id: HandleId, timeout: Option<Duration>) -> Result<bool, SocketError> {
        self.call(id, |s| s.is_writable(timeout))
    }

    pub fn select(&self, id: HandleId, interest: Interest, timeout: Option<Duration>) -> Result<Readiness, SocketError> {
        self.call(id, |s| s.select(interest, timeout))
    }

    pub fn set_option(&self, id: HandleId, level: i32, name: i32, value: &[u8]) -> Result<(), SocketError> {
        self.call(id, |s| s.set_option(level, name, value))
    }

    pub fn get_option(&self, id: HandleId, level: i32, name: i32, len: usize) -> Result<Vec<u8>, SocketError> {
        self.call(id, |s| s.get_option(level, name, len))
    }

    pub fn set_blocking(&self, id: HandleId, blocking: bool) -> Result<(), SocketError> {
        self.call(id, |s| s.set_blocking(blocking))
    }

    pub fn blocking(&self, id: HandleId) -> Result<bool, SocketError> {
        self.inspect(id, Socket::blocking)
    }

    pub fn set_reuse_addr(&self, id: HandleId, enable: bool) -> Result<(), SocketError> {
        self.call(id, |s| s.set_reuse_addr(enable))
    }

    pub fn reuse_addr(&self, id: HandleId) -> Result<bool, SocketError> {
        self.call(id, Socket::reuse_addr)
    }

    pub fn set_broadcast(&self, id: HandleId, enable: bool) -> Result<(), SocketError> {
        self.call(id, |s| s.set_broadcast(enable))
    }

    pub fn broadcast(&self, id: HandleId) -> Result<bool, SocketError> {
        self.call(id, Socket::broadcast)
    }

    pub fn set_recv_buffer_size(&self, id: HandleId, size: usize) -> Result<(), SocketError> {
        self.call(id, |s| s.set_recv_buffer_size(size))
    }

    pub fn recv_buffer_size(&self, id: HandleId) -> Result<usize, SocketError> {
        self.call(id, Socket::recv_buffer_size)
    }

    pub fn set_send_buffer_size(&self, id: HandleId, size: usize) -> Result<(), SocketError> {
        self.call(id, |s| s.set_send_buffer_size(size))
    }

    pub fn send_buffer_size(&self, id: HandleId) -> Result<usize, SocketError> {
        self.call(id, Socket::send_buffer_size)
    }

    pub fn set_nodelay(&self, id: HandleId, enable: bool) -> Result<(), SocketError> {
        self.call(id, |s| s.set_nodelay(enable))
    }

    pub fn nodelay(&self, id: HandleId) -> Result<bool, SocketError> {
        self.call(id, Socket::nodelay)
    }

    pub fn set_timeout(&self, id: HandleId, timeout: Duration) -> Result<(), SocketError> {
        self.inspect_mut(id, |s| s.set_timeout(timeout))
    }

    pub fn timeout(&self, id: HandleId) -> Result<Duration, SocketError> {
        self.inspect(id, Socket::timeout)
    }

    pub fn state(&self, id: HandleId) -> Result<SocketState, SocketError> {
        self.inspect(id, Socket::state)
    }

    pub fn local_addr(&self, id: HandleId) -> Result<Option<Address>, SocketError> {
        self.inspect(id, |s| s.local_addr().cloned())
    }

    pub fn remote_addr(&self, id: HandleId) -> Result<Option<Address>, SocketError> {
        self.inspect(id, |s| s.remote_addr().cloned())
    }

    pub fn descriptor(&self, id: HandleId) -> Result<Option<RawDescriptor>, SocketError> {
        self.inspect(id, Socket::descriptor)
    }

    /// Diagnostic rendering, e.g. `SOCKET(ID=7;DOMAIN=INET;TYPE=STREAM;PROTO=TCP;LOCAL=127.0.0.1:4000)`
    pub fn describe(&self, id: HandleId) -> Result<String, SocketError> {
        self.inspect(id, Socket::to_string)
    }

    /// Last error of a handle, or the process-wide one
    ///
    /// Falls back to the process-wide slot when `id` is `None` or names no
    /// live handle.
    pub fn last_error(&self, id: Option<HandleId>) -> LastError {
        match id.and_then(|id| self.registry.find(id)) {
            Some(handle) => handle.lock().last_error().clone(),
            None => global_last_error(),
        }
    }

    /// Overwrite the last error of a handle, or the process-wide one
    pub fn set_error(&self, id: Option<HandleId>, error: LastError) -> Result<(), SocketError> {
        match id {
            Some(id) => self.inspect_mut(id, |s| s.set_last_error(error)),
            None => {
                set_global_last_error(error);
                Ok(())
            }
        }
    }

    /// Reset the last error of a handle, or the process-wide one
    pub fn clear_error(&self, id: Option<HandleId>) -> Result<(), SocketError> {
        match id {
            Some(id) => self.inspect_mut(id, Socket::clear_last_error),
            None => {
                clear_global_error();
                Ok(())
            }
        }
    }

    /// Forward lookup of a host name to its first numeric address
    pub fn resolve_name(&self, name: &str) -> Result<String, SocketError> {
        resolver::resolve_name(name).map_err(global_failure)
    }

    /// Reverse lookup of a numeric address; fails when no name exists
    pub fn reverse_resolve(&self, host: &str) -> Result<String, SocketError> {
        resolver::reverse_resolve_host(host).map_err(global_failure)
    }

    pub fn lookup(
        &self,
        node: Option<&str>,
        service: Option<&str>,
        hints: &LookupHints,
    ) -> Result<Vec<ResolvedAddress>, SocketError> {
        resolver::lookup(node, service, hints).map_err(global_failure)
    }

    pub fn name_info(&self, address: &Address, flags: i32) -> Result<(String, String), SocketError> {
        resolver::name_info(address, flags).map_err(global_failure)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Identities of all live handles, ascending
    pub fn ids(&self) -> Vec<HandleId> {
        self.registry.ids()
    }

    /// Close every handle and refuse further registrations
    pub fn teardown(&self) {
        let handles = self.registry.teardown();
        tracing::debug!(count = handles.len(), "tearing down socket registry");
        for handle in handles {
            handle.lock().close();
        }
    }

    fn register(&self, socket: Socket) -> Result<HandleId, SocketError> {
        match self.registry.register(socket) {
            Some(id) => {
                tracing::debug!(%id, "socket registered");
                Ok(id)
            }
            None => Err(global_failure(SocketError::InvalidArgument(
                "socket registry has been torn down".to_string(),
            ))),
        }
    }

    fn handle(&self, id: HandleId) -> Result<SharedHandle<Socket>, SocketError> {
        self.registry.find(id).ok_or_else(|| unknown(id))
    }

    /// Run a fallible operation under the handle's lock
    fn call<R>(&self, id: HandleId, op: impl FnOnce(&mut Socket) -> Result<R, SocketError>) -> Result<R, SocketError> {
        let handle = self.handle(id)?;
        let mut socket = handle.lock();
        op(&mut socket)
    }

    fn inspect<R>(&self, id: HandleId, op: impl FnOnce(&Socket) -> R) -> Result<R, SocketError> {
        let handle = self.handle(id)?;
        let socket = handle.lock();
        Ok(op(&socket))
    }

    fn inspect_mut<R>(&self, id: HandleId, op: impl FnOnce(&mut Socket) -> R) -> Result<R, SocketError> {
        let handle = self.handle(id)?;
        let mut socket = handle.lock();
        Ok(op(&mut socket))
    }
}

impl Default for SocketManager {
    fn default() -> Self {
        Self::new()
    }
}

fn global_failure(err: SocketError) -> SocketError {
    set_global_error(&err);
    err
}

fn unknown(id: HandleId) -> SocketError {
    global_failure(SocketError::UnknownHandle(id))
}
