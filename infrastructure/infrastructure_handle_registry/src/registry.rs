//! Handle Registry Module
//!
//! Cascaded table mapping handle identities to shared, individually locked
//! handle values.

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

use std::collections::HashMap;
use std::sync::Arc;

use entities_socket::HandleId;
use parking_lot::Mutex;

/// Number of cascade buckets handles are spread over
pub const REGISTRY_CASCADES: usize = 9;

/// A registered handle: shared ownership plus its own lock
pub type SharedHandle<T> = Arc<Mutex<T>>;

struct RegistryState<T> {
    buckets: Vec<HashMap<HandleId, SharedHandle<T>>>,
    /// Last identity handed out; identities start at 1
    counter: u64,
    torn_down: bool,
}

/// Process-wide handle registry
///
/// All mutations and lookups are serialized by one registry lock. The lock
/// is never held while a caller operates on a handle: lookups hand back a
/// clone of the handle's `Arc` and release the registry immediately.
///
/// # Examples
/// ```
/// use infrastructure_handle_registry::HandleRegistry;
///
/// let registry = HandleRegistry::new();
/// let id = registry.register("socket").unwrap();
/// assert_eq!(*registry.find(id).unwrap().lock(), "socket");
/// registry.remove(id);
/// assert!(registry.find(id).is_none());
/// ```
pub struct HandleRegistry<T> {
    state: Mutex<RegistryState<T>>,
}

impl<T> HandleRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                buckets: (0..REGISTRY_CASCADES).map(|_| HashMap::new()).collect(),
                counter: 0,
                torn_down: false,
            }),
        }
    }

    /// Bucket an identity lives in
    pub fn cascade_of(id: HandleId) -> usize {
        (id.as_u64() % REGISTRY_CASCADES as u64) as usize
    }

    /// Register a handle and allocate its identity
    ///
    /// # Arguments
    /// * `value` - Handle to take ownership of
    ///
    /// # Returns
    /// * `Some(HandleId)` - Newly allocated identity, strictly greater than
    ///   every identity allocated before it
    /// * `None` - The registry has been torn down
    pub fn register(&self, value: T) -> Option<HandleId> {
        let mut state = self.state.lock();
        if state.torn_down {
            return None;
        }
        state.counter += 1;
        let id = HandleId::new(state.counter);
        let cascade = Self::cascade_of(id);
        tracing::trace!(id = id.as_u64(), cascade, "register handle");
        state.buckets[cascade].insert(id, Arc::new(Mutex::new(value)));
        Some(id)
    }

    /// Look up a live handle
    ///
    /// # Returns
    /// * `Some(SharedHandle)` - The handle registered under `id`
    /// * `None` - Unknown, removed, or the registry was torn down
    pub fn find(&self, id: HandleId) -> Option<SharedHandle<T>> {
        let state = self.state.lock();
        if state.torn_down {
            return None;
        }
        let found = state.buckets[Self::cascade_of(id)].get(&id).cloned();
        if found.is_none() {
            tracing::trace!(id = id.as_u64(), "handle not found");
        }
        found
    }

    /// Unregister a handle
    ///
    /// Removing an identity that is not registered is a no-op.
    ///
    /// # Returns
    /// The removed handle, for the caller to release
    pub fn remove(&self, id: HandleId) -> Option<SharedHandle<T>> {
        let mut state = self.state.lock();
        let removed = state.buckets[Self::cascade_of(id)].remove(&id);
        if removed.is_some() {
            tracing::trace!(id = id.as_u64(), "remove handle");
        }
        removed
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.state.lock().buckets.iter().map(HashMap::len).sum()
    }

    /// Whether no handles are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities of all live handles, ascending
    pub fn ids(&self) -> Vec<HandleId> {
        let state = self.state.lock();
        let mut ids: Vec<HandleId> = state
            .buckets
            .iter()
            .flat_map(|bucket| bucket.keys().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Tear the registry down at process shutdown
    ///
    /// Every live handle is drained and handed back for release. Afterwards
    /// lookups return nothing and registration is refused.
    pub fn teardown(&self) -> Vec<SharedHandle<T>> {
        let mut state = self.state.lock();
        state.torn_down = true;
        let drained: Vec<SharedHandle<T>> = state
            .buckets
            .iter_mut()
            .flat_map(|bucket| bucket.drain().map(|(_, handle)| handle))
            .collect();
        tracing::debug!(count = drained.len(), "handle registry torn down");
        drained
    }

    /// Whether [`HandleRegistry::teardown`] has run
    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
