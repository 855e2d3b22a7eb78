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

//! Named, typed resources published by producers and owned by a scene.

mod loader;

pub use loader::ResourceLoader;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The tables a [`ResourceLoader`] keeps resources in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Images and anything else drawable.
    Renderable,
    /// Sound effects and music.
    Sound,
    /// Raw files.
    File,
    /// Fonts.
    Font,
    /// Any other shared object.
    Object,
}

impl ResourceKind {
    /// Every kind, in the order producers are consulted.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Renderable,
        ResourceKind::Sound,
        ResourceKind::File,
        ResourceKind::Font,
        ResourceKind::Object,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Renderable => "renderable",
            ResourceKind::Sound => "sound",
            ResourceKind::File => "file",
            ResourceKind::Font => "font",
            ResourceKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// How a loader treats a second producer of an already registered concrete type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerDedup {
    /// Skip it; each producer type contributes once per load.
    #[default]
    PerType,
    /// Keep it; name collisions then surface as duplicate-resource errors.
    AllowDuplicates,
}

/// A resource that holds something needing explicit release.
pub trait Closable: Send + Sync + 'static {
    /// Releases the underlying asset. Called once, when the owning loader is killed.
    fn close(&self);
}

/// A shared, type-erased reference to a loaded resource.
#[derive(Clone)]
pub struct ResourceHandle {
    value: Arc<dyn Any + Send + Sync>,
    closer: Option<Arc<dyn Fn() + Send + Sync>>,
    type_name: &'static str,
}

impl ResourceHandle {
    /// Wraps a value with no release step.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            closer: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wraps a value whose [`Closable::close`] runs when the loader is killed.
    pub fn closable<T: Closable>(value: T) -> Self {
        let value = Arc::new(value);
        let target = Arc::clone(&value);
        Self {
            value,
            closer: Some(Arc::new(move || target.close())),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The value, if it is a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Whether both handles point at the same resource.
    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Name of the wrapped type, for logs.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn close(&self) {
        if let Some(closer) = &self.closer {
            closer();
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("type_name", &self.type_name)
            .field("closable", &self.closer.is_some())
            .finish()
    }
}

/// Resources a producer publishes for one kind, keyed by name.
pub type ResourceMap = HashMap<String, ResourceHandle>;

/// A producer of resources, consulted by [`ResourceLoader::load`].
///
/// Each method receives the context (usually the scene name) the load runs for
/// and returns the resources it wants published. Unneeded kinds keep the
/// empty default.
pub trait Loadable: Send + Sync + 'static {
    /// Drawable resources.
    fn load_renderables(&self, _context: &str) -> anyhow::Result<ResourceMap> {
        Ok(ResourceMap::new())
    }

    /// Sounds.
    fn load_sounds(&self, _context: &str) -> anyhow::Result<ResourceMap> {
        Ok(ResourceMap::new())
    }

    /// Raw files.
    fn load_files(&self, _context: &str) -> anyhow::Result<ResourceMap> {
        Ok(ResourceMap::new())
    }

    /// Fonts.
    fn load_fonts(&self, _context: &str) -> anyhow::Result<ResourceMap> {
        Ok(ResourceMap::new())
    }

    /// Generic shared objects.
    fn load_objects(&self, _context: &str) -> anyhow::Result<ResourceMap> {
        Ok(ResourceMap::new())
    }
}

pub(crate) fn produce(
    producer: &dyn Loadable,
    kind: ResourceKind,
    context: &str,
) -> anyhow::Result<ResourceMap> {
    match kind {
        ResourceKind::Renderable => producer.load_renderables(context),
        ResourceKind::Sound => producer.load_sounds(context),
        ResourceKind::File => producer.load_files(context),
        ResourceKind::Font => producer.load_fonts(context),
        ResourceKind::Object => producer.load_objects(context),
    }
}
