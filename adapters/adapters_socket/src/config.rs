//! Socket Configuration Module
//!
//! The creation record for a socket handle, either built in code or parsed
//! from string key/value pairs.

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

use std::time::Duration;

use entities_socket::{AddressFamily, Protocol, SocketType};
use infrastructure_socket_errors::SocketError;

use crate::resolver::protocol_by_name;

/// Timeout applied to connects when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest accepted listen backlog
#[cfg(unix)]
pub const LISTEN_BACKLOG_MAX: i32 = libc::SOMAXCONN;
#[cfg(windows)]
pub const LISTEN_BACKLOG_MAX: i32 = 0x7fff_ffff;

/// Socket creation configuration
///
/// With defaults the handle is an IPv4 TCP stream socket, blocking, with a
/// 15 second connect timeout, neither bound nor connected.
///
/// Local fields request a bind, `listen` requests a listening socket and
/// remote fields request a connect during creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketConfig {
    pub family: AddressFamily,
    pub socket_type: SocketType,
    pub protocol: Protocol,
    /// Local host, or the filesystem path for Unix sockets
    pub local_host: Option<String>,
    pub local_service: Option<String>,
    /// Remote host, or the filesystem path for Unix sockets
    pub remote_host: Option<String>,
    pub remote_service: Option<String>,
    /// Listen backlog; `None` means the handle does not listen
    pub listen: Option<i32>,
    pub blocking: bool,
    pub broadcast: bool,
    pub reuse_addr: bool,
    pub timeout: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            family: AddressFamily::Inet,
            socket_type: SocketType::Stream,
            protocol: Protocol::TCP,
            local_host: None,
            local_service: None,
            remote_host: None,
            remote_service: None,
            listen: None,
            blocking: true,
            broadcast: false,
            reuse_addr: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SocketConfig {
    /// TCP stream configuration for `family`
    pub fn tcp(family: AddressFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    /// UDP datagram configuration for `family`
    pub fn udp(family: AddressFamily) -> Self {
        Self {
            family,
            socket_type: SocketType::Datagram,
            protocol: Protocol::UDP,
            ..Self::default()
        }
    }

    /// Unix-domain configuration of the given type
    pub fn unix(socket_type: SocketType) -> Self {
        Self {
            family: AddressFamily::Unix,
            socket_type,
            protocol: Protocol::DEFAULT,
            ..Self::default()
        }
    }

    /// Request a bind to `host`/`service` during creation
    pub fn with_local(mut self, host: Option<&str>, service: Option<&str>) -> Self {
        self.local_host = host.map(str::to_string);
        self.local_service = service.map(str::to_string);
        self
    }

    /// Request a connect to `host`/`service` during creation
    pub fn with_remote(mut self, host: Option<&str>, service: Option<&str>) -> Self {
        self.remote_host = host.map(str::to_string);
        self.remote_service = service.map(str::to_string);
        self
    }

    /// Request a listening socket with the given backlog (clamped)
    pub fn with_listen(mut self, backlog: i32) -> Self {
        self.listen = clamp_backlog(backlog);
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reuse_addr(mut self, reuse_addr: bool) -> Self {
        self.reuse_addr = reuse_addr;
        self
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Whether creation binds a local address
    pub fn wants_bind(&self) -> bool {
        self.local_host.is_some() || self.local_service.is_some() || self.listen.is_some()
    }

    /// Whether creation connects to a peer
    pub fn wants_connect(&self) -> bool {
        self.remote_host.is_some() || self.remote_service.is_some()
    }

    /// Parse a flat `key, value, key, value, ...` argument list
    ///
    /// # Returns
    ///
    /// * `Ok(SocketConfig)` - Parsed configuration
    /// * `Err(SocketError::InvalidArgument)` - Odd number of arguments
    pub fn from_args(args: &[&str]) -> Result<Self, SocketError> {
        if args.len() % 2 != 0 {
            return Err(SocketError::InvalidArgument("invalid arguments".to_string()));
        }
        Ok(Self::from_pairs(
            args.chunks_exact(2).map(|pair| (pair[0], pair[1])),
        ))
    }

    /// Parse string key/value pairs
    ///
    /// Keys are case-insensitive and unknown keys are ignored. Recognized keys:
    /// `domain`/`family`, `type`, `proto`, `local_addr`, `local_path`,
    /// `local_port`, `remote_addr`, `remote_path`, `remote_port`, `listen`,
    /// `blocking`, `broadcast`, `reuseaddr` and `timeout` (milliseconds).
    ///
    /// `proto=UDP` switches the type to datagram whatever the family.
    /// Timeouts too large for a [`Duration`] saturate.
    ///
    /// # Examples
    /// ```
    /// use adapters_socket::SocketConfig;
    /// use entities_socket::SocketType;
    ///
    /// let config = SocketConfig::from_pairs([("proto", "udp"), ("local_addr", "127.0.0.1")]);
    /// assert_eq!(config.socket_type, SocketType::Datagram);
    /// assert_eq!(config.local_service.as_deref(), Some("0"));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.apply(key.as_ref(), value.as_ref());
        }
        if config.local_host.is_some() && config.local_service.is_none() {
            config.local_service = Some("0".to_string());
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key.to_ascii_lowercase().as_str() {
            "domain" | "family" => match AddressFamily::from_name(value) {
                Some(family) => {
                    self.family = family;
                    match family {
                        AddressFamily::Unix => self.protocol = Protocol::DEFAULT,
                        AddressFamily::Bluetooth => self.protocol = Protocol::RFCOMM,
                        _ => {}
                    }
                }
                None => tracing::debug!("unknown socket family {:?}", value),
            },
            "type" => match SocketType::from_name(value) {
                Some(socket_type) => self.socket_type = socket_type,
                None => tracing::debug!("unknown socket type {:?}", value),
            },
            "proto" => {
                self.protocol = protocol_by_name(value).unwrap_or(Protocol::DEFAULT);
                if self.protocol == Protocol::UDP {
                    self.socket_type = SocketType::Datagram;
                }
            }
            "local_addr" => self.local_host = Some(value.to_string()),
            "local_path" => {
                self.local_host = Some(value.to_string());
                self.family = AddressFamily::Unix;
                self.protocol = Protocol::DEFAULT;
            }
            "local_port" => self.local_service = Some(value.to_string()),
            "remote_addr" => self.remote_host = Some(value.to_string()),
            "remote_path" => {
                self.remote_host = Some(value.to_string());
                self.family = AddressFamily::Unix;
                self.protocol = Protocol::DEFAULT;
            }
            "remote_port" => self.remote_service = Some(value.to_string()),
            "listen" => match value.trim().parse::<i32>() {
                Ok(backlog) => self.listen = clamp_backlog(backlog),
                Err(_) => tracing::debug!("invalid listen backlog {:?}", value),
            },
            "blocking" => self.blocking = parse_flag(value),
            "broadcast" => self.broadcast = parse_flag(value),
            "reuseaddr" => self.reuse_addr = parse_flag(value),
            "timeout" => match value.trim().parse::<f64>().ok().and_then(duration_from_millis) {
                Some(timeout) => self.timeout = timeout,
                None => tracing::debug!("invalid timeout {:?}", value),
            },
            other => tracing::debug!("ignoring socket option {:?}", other),
        }
    }
}

/// Clamp a listen backlog; 0 disables listening
///
/// Negative values and values above the platform maximum become the maximum.
pub fn clamp_backlog(backlog: i32) -> Option<i32> {
    match backlog {
        0 => None,
        b if b < 0 || b > LISTEN_BACKLOG_MAX => Some(LISTEN_BACKLOG_MAX),
        b => Some(b),
    }
}

/// Convert fractional milliseconds to a [`Duration`]
///
/// Negative and NaN values have no duration; values beyond the range of
/// [`Duration`] (including infinity) saturate to [`Duration::MAX`].
pub fn duration_from_millis(ms: f64) -> Option<Duration> {
    if ms.is_nan() || ms < 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX))
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}
