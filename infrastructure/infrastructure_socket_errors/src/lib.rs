//! Infrastructure Layer: Socket Error Normalization
//!
//! Turns platform failures (errno values, Winsock codes and resolver codes)
//! into one error taxonomy with a human-readable message, and keeps the
//! "last error" bookkeeping every socket handle exposes.
//!
//! ## Overview
//!
//! - [`SocketError`]: the error type returned by every socket operation
//! - [`describe_os_error`] / [`describe_resolver_error`]: message rendering
//! - [`is_would_block`]: the "no data yet" condition, which is not an error
//! - [`LastError`] and the process-wide slot for failures with no handle
//!
//! In debug builds every rendered OS message carries its numeric code as a
//! `"(code) "` prefix.
//!
//! ## See Also
//!
//! - `adapters_socket`: records a [`LastError`] on each handle
//! - `api_facades`: records handle-less failures in the global slot

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

pub mod error;
pub mod last_error;
pub mod normalize;

pub use error::SocketError;
pub use last_error::{
    clear_global_error, global_last_error, set_global_error, set_global_last_error, LastError,
};
pub use normalize::{codes, describe_os_error, describe_resolver_error, is_in_progress, is_would_block};
