//! Infrastructure Layer: Handle Registry
//!
//! Provides the process-wide table of live socket handles, keyed by a
//! monotonically increasing [`HandleId`](entities_socket::HandleId).
//!
//! ## Overview
//!
//! The registry owns every handle's existence. Callers receive an identity on
//! registration and use it to look the handle up again; a lookup of an
//! identity that was removed (or never existed) yields nothing rather than a
//! dangling reference.
//!
//! Handles are spread over a fixed number of cascade buckets by
//! `id % REGISTRY_CASCADES`. One lock guards all buckets together; each
//! handle carries its own lock for the operations performed on it.
//!
//! ## See Also
//!
//! - `api_facades`: holds the process-wide socket registry

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

pub mod registry;

pub use registry::{HandleRegistry, SharedHandle, REGISTRY_CASCADES};
