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

use super::{produce, Loadable, ProducerDedup, ResourceHandle, ResourceKind};
use crate::error::ResourceError;
use crate::utils::timer::Stopwatch;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

struct RegisteredProducer {
    type_id: TypeId,
    type_name: &'static str,
    producer: Box<dyn Loadable>,
}

type ClosingOperation = Box<dyn FnOnce() + Send>;

/// A per-scene registry of named resources, partitioned by [`ResourceKind`].
///
/// Producers registered with [`register`](Self::register) are consulted by the
/// next [`load`](Self::load). Names are case-insensitive. After
/// [`kill`](Self::kill) every accessor fails with [`ResourceError::LoaderKilled`].
pub struct ResourceLoader {
    dedup: ProducerDedup,
    producers: Vec<RegisteredProducer>,
    tables: HashMap<ResourceKind, HashMap<String, ResourceHandle>>,
    closing_operations: Vec<ClosingOperation>,
    killed: bool,
}

impl ResourceLoader {
    /// Creates an empty loader with the given producer policy.
    pub fn new(dedup: ProducerDedup) -> Self {
        Self {
            dedup,
            producers: Vec::new(),
            tables: HashMap::new(),
            closing_operations: Vec::new(),
            killed: false,
        }
    }

    /// The producer policy in effect.
    pub fn dedup(&self) -> ProducerDedup {
        self.dedup
    }

    /// Queues a producer for the next load.
    ///
    /// Under [`ProducerDedup::PerType`] a producer whose concrete type is
    /// already queued is skipped and `false` is returned.
    pub fn register<L: Loadable>(&mut self, producer: L) -> bool {
        let type_id = TypeId::of::<L>();
        let type_name = std::any::type_name::<L>();
        if self.dedup == ProducerDedup::PerType
            && self.producers.iter().any(|p| p.type_id == type_id)
        {
            log::debug!("Skipping duplicate producer {type_name}");
            return false;
        }
        self.producers.push(RegisteredProducer {
            type_id,
            type_name,
            producer: Box::new(producer),
        });
        true
    }

    /// Number of producers waiting for the next load.
    pub fn pending_producers(&self) -> usize {
        self.producers.len()
    }

    /// Consults every queued producer for `context` and publishes the results.
    ///
    /// Returns how many resources were added. The queue is consumed either way.
    pub fn load(&mut self, context: &str) -> Result<usize, ResourceError> {
        if self.killed {
            return Err(ResourceError::LoaderKilled);
        }

        let watch = Stopwatch::start();
        let producers = std::mem::take(&mut self.producers);
        let mut added = 0;
        for registered in &producers {
            for kind in ResourceKind::ALL {
                let published = produce(registered.producer.as_ref(), kind, context).map_err(
                    |source| ResourceError::Producer {
                        producer: registered.type_name,
                        source,
                    },
                )?;
                for (name, handle) in published {
                    self.insert(kind, &name, handle, registered.type_name)?;
                    added += 1;
                }
            }
        }

        log::info!(
            "Loaded {added} resources for '{context}' from {} producers in {:.2} ms",
            producers.len(),
            watch.elapsed_ms_f64()
        );
        Ok(added)
    }

    fn insert(
        &mut self,
        kind: ResourceKind,
        name: &str,
        handle: ResourceHandle,
        producer: &str,
    ) -> Result<(), ResourceError> {
        let key = normalize(name);
        let table = self.tables.entry(kind).or_default();
        if table.contains_key(&key) {
            return Err(ResourceError::DuplicateResource { kind, name: key });
        }
        log::debug!(
            "Added {kind} resource '{key}' ({}) from {producer}",
            handle.type_name()
        );
        table.insert(key, handle);
        Ok(())
    }

    /// Looks a resource up by kind and case-insensitive name.
    pub fn get(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceHandle>, ResourceError> {
        if self.killed {
            return Err(ResourceError::LoaderKilled);
        }
        Ok(self
            .tables
            .get(&kind)
            .and_then(|table| table.get(&normalize(name)))
            .cloned())
    }

    /// Looks a resource up and downcasts it to `T`. A type mismatch yields `None`.
    pub fn get_as<T: Send + Sync + 'static>(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<Arc<T>>, ResourceError> {
        Ok(self.get(kind, name)?.and_then(|handle| handle.downcast::<T>()))
    }

    /// A drawable resource.
    pub fn get_renderable(&self, name: &str) -> Result<Option<ResourceHandle>, ResourceError> {
        self.get(ResourceKind::Renderable, name)
    }

    /// A sound.
    pub fn get_sound(&self, name: &str) -> Result<Option<ResourceHandle>, ResourceError> {
        self.get(ResourceKind::Sound, name)
    }

    /// A raw file.
    pub fn get_file(&self, name: &str) -> Result<Option<ResourceHandle>, ResourceError> {
        self.get(ResourceKind::File, name)
    }

    /// A font.
    pub fn get_font(&self, name: &str) -> Result<Option<ResourceHandle>, ResourceError> {
        self.get(ResourceKind::Font, name)
    }

    /// A generic object.
    pub fn get_object(&self, name: &str) -> Result<Option<ResourceHandle>, ResourceError> {
        self.get(ResourceKind::Object, name)
    }

    /// Number of resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.tables.get(&kind).map_or(0, HashMap::len)
    }

    /// Registers a callback run by [`kill`](Self::kill), after resources are closed.
    pub fn on_close(&mut self, operation: impl FnOnce() + Send + 'static) {
        self.closing_operations.push(Box::new(operation));
    }

    /// Whether [`kill`](Self::kill) has run.
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Closes every closable resource, runs closing operations and empties the tables.
    ///
    /// Safe to call on a loader that never loaded anything, and more than once.
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;

        let mut closed = 0;
        for table in self.tables.values() {
            for handle in table.values() {
                handle.close();
                closed += 1;
            }
        }
        for operation in self.closing_operations.drain(..) {
            operation();
        }
        self.tables.clear();
        self.producers.clear();
        log::debug!("Resource loader killed; released {closed} resources.");
    }
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new(ProducerDedup::default())
    }
}

fn normalize(name: &str) -> String {
    name.to_uppercase()
}
