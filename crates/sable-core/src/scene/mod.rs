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

//! Scene lifecycle, the scene registry and the transition controller.
//!
//! A [`Scene`] is the user-written behaviour of a level or menu. The engine
//! wraps each one in a [`SceneInstance`], which owns the scene's resources and
//! objects and enforces the lifecycle:
//!
//! ```text
//! Unloaded -(load)-> Loading -> Loaded -(start)-> Active -(kill)-> Dead
//! ```
//!
//! Instances are built from factories on every transition and never reused.

mod director;
mod instance;
mod loading;
mod registry;

pub use director::SceneDirector;
pub use instance::{SceneInstance, SharedScene};
pub use loading::LoadingIndicator;
pub use registry::{SceneEntry, SceneFactory, SceneRegistry};

use crate::container::ContainerHandle;
use crate::object::ObjectHandler;
use crate::platform::{DrawTarget, Viewport};
use crate::resource::ResourceLoader;

/// Where a [`SceneInstance`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Built, nothing loaded yet.
    Unloaded,
    /// `load` is running.
    Loading,
    /// Loaded, waiting to become current.
    Loaded,
    /// Current and receiving ticks and renders.
    Active,
    /// Killed. The instance is never used again.
    Dead,
}

/// What a scene hook can reach while it runs.
pub struct SceneContext<'a> {
    name: &'a str,
    resources: &'a mut ResourceLoader,
    objects: &'a ObjectHandler,
    container: &'a ContainerHandle,
}

impl<'a> SceneContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        resources: &'a mut ResourceLoader,
        objects: &'a ObjectHandler,
        container: &'a ContainerHandle,
    ) -> Self {
        Self {
            name,
            resources,
            objects,
            container,
        }
    }

    /// The name the scene was registered under.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The scene's resources.
    pub fn resources(&self) -> &ResourceLoader {
        self.resources
    }

    /// The scene's resources, for registering closing operations.
    pub fn resources_mut(&mut self) -> &mut ResourceLoader {
        self.resources
    }

    /// The scene's objects.
    pub fn objects(&self) -> &ObjectHandler {
        self.objects
    }

    /// The container hosting the scene.
    pub fn container(&self) -> &ContainerHandle {
        self.container
    }
}

/// Game content with an explicit lifecycle.
///
/// Only [`load`](Self::load) is required. `tick` and `render` are called only
/// once the scene is current, from the loop thread. `load` runs on the scene
/// loader thread, except for loading scenes, which load on the loop thread.
pub trait Scene: Send + 'static {
    /// Registers the producers consulted before [`load`](Self::load) runs.
    fn register_loadables(&mut self, _resources: &mut ResourceLoader) {}

    /// Builds the scene's content. Resources are already loaded.
    fn load(&mut self, context: &mut SceneContext<'_>) -> anyhow::Result<()>;

    /// Called once, right after the scene became current.
    fn start(&mut self, _context: &mut SceneContext<'_>) {}

    /// Advances the scene. The scene's objects are ticked afterwards.
    fn tick(&mut self, _context: &mut SceneContext<'_>, _delta: f64) -> anyhow::Result<()> {
        Ok(())
    }

    /// Draws the background. Objects are drawn on top of it.
    fn render(&mut self, _frame: &mut dyn DrawTarget, _debug: bool) -> anyhow::Result<()> {
        Ok(())
    }

    /// Draws on top of the scene's objects.
    fn render_overlay(&mut self, _frame: &mut dyn DrawTarget, _debug: bool) -> anyhow::Result<()> {
        Ok(())
    }

    /// Releases anything the scene holds outside its resources and objects.
    fn kill(&mut self) {}

    /// The surface was resized or changed mode.
    fn refresh(&mut self, _viewport: &Viewport) {}
}
