//! Last-error bookkeeping
//!
//! Every handle remembers the code and message of its most recent failure.
//! Failures that happen without a handle (creation, lookups of a stale
//! identity, standalone resolution) land in one process-wide slot.

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

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::error::SocketError;

/// Code and message of the most recent failure
///
/// A code of 0 with an empty message means "no error".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastError {
    pub code: i32,
    pub message: String,
}

impl LastError {
    /// Create a last-error record
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether an error is recorded
    pub fn is_set(&self) -> bool {
        self.code != 0 || !self.message.is_empty()
    }

    /// Reset to "no error"
    pub fn clear(&mut self) {
        self.code = 0;
        self.message.clear();
    }
}

impl From<&SocketError> for LastError {
    fn from(err: &SocketError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

lazy_static! {
    static ref GLOBAL_LAST_ERROR: Mutex<LastError> = Mutex::new(LastError::default());
}

/// Record a failure that is not attached to any handle
pub fn set_global_error(err: &SocketError) {
    tracing::debug!(code = err.code(), "global socket error: {}", err);
    *GLOBAL_LAST_ERROR.lock() = LastError::from(err);
}

/// Overwrite the process-wide slot with an explicit record
pub fn set_global_last_error(error: LastError) {
    *GLOBAL_LAST_ERROR.lock() = error;
}

/// Clear the process-wide slot
pub fn clear_global_error() {
    GLOBAL_LAST_ERROR.lock().clear();
}

/// Snapshot of the process-wide slot
pub fn global_last_error() -> LastError {
    GLOBAL_LAST_ERROR.lock().clone()
}
