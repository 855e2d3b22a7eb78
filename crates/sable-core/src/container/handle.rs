// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::Container;
use crate::error::EngineError;
use std::fmt;
use std::sync::{Arc, Weak};

/// A cloneable, non-owning reference to a [`Container`].
///
/// Scenes reach their container through this handle. Every call on a handle
/// whose container is gone is ignored.
#[derive(Clone, Default)]
pub struct ContainerHandle {
    inner: Weak<Container>,
}

impl ContainerHandle {
    pub(crate) fn new(inner: Weak<Container>) -> Self {
        Self { inner }
    }

    /// A handle that is not attached to any container.
    pub fn detached() -> Self {
        Self::default()
    }

    /// The container, if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<Container>> {
        self.inner.upgrade()
    }

    /// Whether the container is still alive.
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// See [`Container::request_scene`].
    pub fn request_scene(&self, name: &str) -> Result<(), EngineError> {
        match self.upgrade() {
            Some(container) => container.request_scene(name),
            None => {
                log::warn!("Scene request '{name}' on a detached container handle ignored.");
                Ok(())
            }
        }
    }

    /// See [`Container::set_paused`].
    pub fn set_paused(&self, paused: bool) {
        if let Some(container) = self.upgrade() {
            container.set_paused(paused);
        }
    }

    /// See [`Container::is_paused`]. A detached handle reports `false`.
    pub fn is_paused(&self) -> bool {
        self.upgrade().is_some_and(|container| container.is_paused())
    }

    /// Shuts the container down.
    ///
    /// Called from inside a scene hook, the shutdown runs as soon as the hook
    /// returns.
    pub fn exit(&self) {
        if let Some(container) = self.upgrade() {
            container.request_exit();
        }
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}
