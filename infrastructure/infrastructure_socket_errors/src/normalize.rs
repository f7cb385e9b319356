//! Error Normalizer
//!
//! Renders platform and resolver codes as text and classifies the
//! conditions socket operations treat specially.

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

/// Platform error codes the socket stack inspects directly
pub mod codes {
    #[cfg(unix)]
    mod platform {
        pub const EWOULDBLOCK: i32 = libc::EWOULDBLOCK;
        pub const EAGAIN: i32 = libc::EAGAIN;
        pub const EINPROGRESS: i32 = libc::EINPROGRESS;
        pub const ETIMEDOUT: i32 = libc::ETIMEDOUT;
        pub const ECONNRESET: i32 = libc::ECONNRESET;
        pub const EAFNOSUPPORT: i32 = libc::EAFNOSUPPORT;
        pub const EINVAL: i32 = libc::EINVAL;
    }

    #[cfg(windows)]
    mod platform {
        pub const EWOULDBLOCK: i32 = 10035;
        pub const EAGAIN: i32 = 10035;
        pub const EINPROGRESS: i32 = 10036;
        pub const ETIMEDOUT: i32 = 10060;
        pub const ECONNRESET: i32 = 10054;
        pub const EAFNOSUPPORT: i32 = 10047;
        pub const EINVAL: i32 = 10022;
    }

    pub use platform::*;
}

/// Render an OS error code as text
///
/// The message is the platform's own description without the
/// `" (os error N)"` suffix the standard library appends. Debug builds
/// prefix it with `"(N) "`.
///
/// # Arguments
///
/// * `code` - errno value, or Winsock code on Windows
///
/// # Returns
///
/// The rendered message
pub fn describe_os_error(code: i32) -> String {
    let full = io::Error::from_raw_os_error(code).to_string();
    let suffix = format!(" (os error {})", code);
    let text = full.strip_suffix(suffix.as_str()).unwrap_or(&full).trim_end();
    with_code_prefix(code, text)
}

/// Render a resolver (getaddrinfo family) error code as text
pub fn describe_resolver_error(code: i32) -> String {
    with_code_prefix(code, &resolver_text(code))
}

#[cfg(unix)]
fn resolver_text(code: i32) -> String {
    // SAFETY: gai_strerror returns a pointer to a static NUL-terminated string.
    unsafe {
        let ptr = libc::gai_strerror(code);
        if ptr.is_null() {
            return format!("resolver error {}", code);
        }
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

#[cfg(windows)]
fn resolver_text(code: i32) -> String {
    // Winsock reports resolver failures with ordinary WSA codes.
    let full = io::Error::from_raw_os_error(code).to_string();
    let suffix = format!(" (os error {})", code);
    full.strip_suffix(suffix.as_str()).unwrap_or(&full).trim_end().to_string()
}

fn with_code_prefix(code: i32, text: &str) -> String {
    if cfg!(debug_assertions) {
        format!("({}) {}", code, text)
    } else {
        text.to_string()
    }
}

/// Whether an I/O failure only means "nothing available yet"
pub fn is_would_block(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    matches!(err.raw_os_error(), Some(c) if c == codes::EWOULDBLOCK || c == codes::EAGAIN)
}

/// Whether a non-blocking connect is still in progress
pub fn is_in_progress(err: &io::Error) -> bool {
    is_would_block(err) || err.raw_os_error() == Some(codes::EINPROGRESS)
}
