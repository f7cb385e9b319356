//! Readiness Module
//!
//! Bounded waits for a descriptor to become readable, writable or to carry
//! exceptional (out-of-band) data, using `poll` on POSIX and `WSAPoll` on
//! Windows.

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
use std::time::{Duration, Instant};

use socket2::Socket as Socket2;

/// Conditions to wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
    pub except: bool,
}

impl Interest {
    pub const READ: Interest = Interest {
        read: true,
        write: false,
        except: false,
    };
    pub const WRITE: Interest = Interest {
        read: false,
        write: true,
        except: false,
    };
}

/// Conditions reported ready; all false after a timeout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub exceptional: bool,
}

impl Readiness {
    /// Whether any requested condition is ready
    pub fn any(&self) -> bool {
        self.readable || self.writable || self.exceptional
    }
}

/// Wait until `socket` satisfies `interest` or `timeout` passes
///
/// A `None` timeout waits indefinitely. Sub-millisecond timeouts round up to
/// one millisecond, and an interrupted wait resumes with whatever remains of
/// the original deadline. Hang-up and error conditions count as readable and
/// writable so that callers observe them on the next call.
///
/// # Returns
///
/// * `Ok(Readiness)` - Ready conditions, all false on timeout
/// * `Err(io::Error)` - Polling failed
pub fn wait(socket: &Socket2, interest: Interest, timeout: Option<Duration>) -> io::Result<Readiness> {
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut remaining = timeout;
    loop {
        match sys::poll_one(socket, interest, poll_timeout_ms(remaining)) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                if let Some(deadline) = deadline {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Readiness::default());
                    }
                    remaining = Some(deadline - now);
                }
            }
            other => return other,
        }
    }
}

/// Millisecond argument for `poll`: -1 for no timeout, partial milliseconds
/// rounded up, saturating at `i32::MAX`
fn poll_timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => i32::try_from(t.as_nanos().div_ceil(1_000_000)).unwrap_or(i32::MAX),
    }
}

#[cfg(unix)]
mod sys {
    use super::{Interest, Readiness};
    use socket2::Socket as Socket2;
    use std::io;
    use std::os::unix::io::AsRawFd;

    pub(super) fn poll_one(socket: &Socket2, interest: Interest, timeout_ms: i32) -> io::Result<Readiness> {
        let mut events: libc::c_short = 0;
        if interest.read {
            events |= libc::POLLIN;
        }
        if interest.write {
            events |= libc::POLLOUT;
        }
        if interest.except {
            events |= libc::POLLPRI;
        }
        let mut fd = libc::pollfd {
            fd: socket.as_raw_fd(),
            events,
            revents: 0,
        };
        // SAFETY: one valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut fd, 1, timeout_ms) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        if rc == 0 {
            return Ok(Readiness::default());
        }
        let hangup = fd.revents & (libc::POLLHUP | libc::POLLERR) != 0;
        Ok(Readiness {
            readable: interest.read && (fd.revents & libc::POLLIN != 0 || hangup),
            writable: interest.write && (fd.revents & libc::POLLOUT != 0 || hangup),
            exceptional: interest.except && fd.revents & libc::POLLPRI != 0,
        })
    }
}

#[cfg(windows)]
mod sys {
    use super::{Interest, Readiness};
    use socket2::Socket as Socket2;
    use std::io;
    use std::os::windows::io::AsRawSocket;
    use windows_sys::Win32::Networking::WinSock::{
        WSAGetLastError, WSAPoll, POLLERR, POLLHUP, POLLRDBAND, POLLRDNORM, POLLWRNORM, SOCKET,
        WSAPOLLFD,
    };

    pub(super) fn poll_one(socket: &Socket2, interest: Interest, timeout_ms: i32) -> io::Result<Readiness> {
        let mut events = 0;
        if interest.read {
            events |= POLLRDNORM;
        }
        if interest.write {
            events |= POLLWRNORM;
        }
        if interest.except {
            events |= POLLRDBAND;
        }
        let mut fd = WSAPOLLFD {
            fd: socket.as_raw_socket() as SOCKET,
            events,
            revents: 0,
        };
        // SAFETY: one valid WSAPOLLFD for the duration of the call.
        let rc = unsafe { WSAPoll(&mut fd, 1, timeout_ms) };
        if rc < 0 {
            return Err(io::Error::from_raw_os_error(unsafe { WSAGetLastError() }));
        }
        if rc == 0 {
            return Ok(Readiness::default());
        }
        let hangup = fd.revents & (POLLHUP | POLLERR) != 0;
        Ok(Readiness {
            readable: interest.read && (fd.revents & POLLRDNORM != 0 || hangup),
            writable: interest.write && (fd.revents & POLLWRNORM != 0 || hangup),
            exceptional: interest.except && fd.revents & POLLRDBAND != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Protocol, SockAddr, Type};
    use std::net::SocketAddr;

    fn udp_pair() -> (Socket2, Socket2) {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let a = Socket2::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        let b = Socket2::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        a.bind(&SockAddr::from(any)).unwrap();
        b.bind(&SockAddr::from(any)).unwrap();
        (a, b)
    }

    #[test]
    fn test_read_times_out_when_idle() {
        let (a, _b) = udp_pair();
        let ready = wait(&a, Interest::READ, Some(Duration::from_millis(20))).unwrap();
        assert!(!ready.any());
    }

    #[test]
    fn test_poll_timeout_rounds_up() {
        assert_eq!(poll_timeout_ms(None), -1);
        assert_eq!(poll_timeout_ms(Some(Duration::ZERO)), 0);
        assert_eq!(poll_timeout_ms(Some(Duration::from_micros(200))), 1);
        assert_eq!(poll_timeout_ms(Some(Duration::from_micros(1500))), 2);
        assert_eq!(poll_timeout_ms(Some(Duration::from_millis(20))), 20);
        assert_eq!(poll_timeout_ms(Some(Duration::MAX)), i32::MAX);
    }

    #[test]
    fn test_sub_millisecond_wait_still_blocks() {
        let (a, _b) = udp_pair();
        let started = Instant::now();
        let ready = wait(&a, Interest::READ, Some(Duration::from_micros(200))).unwrap();
        assert!(!ready.any());
        assert!(started.elapsed() >= Duration::from_micros(200));
    }

    #[test]
    fn test_udp_is_writable() {
        let (a, _b) = udp_pair();
        let ready = wait(&a, Interest::WRITE, Some(Duration::from_millis(100))).unwrap();
        assert!(ready.writable);
        assert!(!ready.readable);
    }

    #[test]
    fn test_readable_after_datagram() {
        let (a, b) = udp_pair();
        let target = a.local_addr().unwrap();
        b.send_to(b"ping", &target).unwrap();
        let ready = wait(&a, Interest::READ, Some(Duration::from_secs(2))).unwrap();
        assert!(ready.readable);
    }
}
