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

use super::{Scene, SceneContext, SceneState};
use crate::container::ContainerHandle;
use crate::error::EngineError;
use crate::object::ObjectHandler;
use crate::platform::{DrawTarget, Viewport};
use crate::resource::{ProducerDedup, ResourceLoader};
use crate::utils::timer::Stopwatch;
use std::sync::{Arc, Mutex};

/// A scene instance shared between the loop thread and the loader thread.
pub type SharedScene = Arc<Mutex<SceneInstance>>;

/// A [`Scene`] together with the resources and objects it owns.
///
/// Gates every hook on the lifecycle state: ticking or rendering an instance
/// that is not active is a no-op.
pub struct SceneInstance {
    name: String,
    state: SceneState,
    resources: ResourceLoader,
    objects: ObjectHandler,
    container: ContainerHandle,
    behaviour: Box<dyn Scene>,
}

impl SceneInstance {
    /// Wraps a freshly built scene.
    pub fn new(
        name: impl Into<String>,
        behaviour: Box<dyn Scene>,
        dedup: ProducerDedup,
        container: ContainerHandle,
    ) -> Self {
        Self {
            name: name.into(),
            state: SceneState::Unloaded,
            resources: ResourceLoader::new(dedup),
            objects: ObjectHandler::new(),
            container,
            behaviour,
        }
    }

    /// Wraps the instance for sharing.
    pub fn into_shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lifecycle state.
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Whether loading has completed and the instance has not been killed.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SceneState::Loaded | SceneState::Active)
    }

    /// Whether the instance is current and receiving ticks and renders.
    pub fn is_active(&self) -> bool {
        self.state == SceneState::Active
    }

    /// The scene's resources.
    pub fn resources(&self) -> &ResourceLoader {
        &self.resources
    }

    /// The scene's objects.
    pub fn objects(&self) -> &ObjectHandler {
        &self.objects
    }

    /// Loads producers' resources, then the scene's own content.
    ///
    /// Valid once per instance.
    pub fn load(&mut self) -> Result<(), EngineError> {
        if self.state != SceneState::Unloaded {
            return Err(EngineError::SceneReused(self.name.clone()));
        }
        self.state = SceneState::Loading;
        let watch = Stopwatch::start();

        self.behaviour.register_loadables(&mut self.resources);
        self.resources.load(&self.name).map_err(|e| EngineError::SceneLoad {
            scene: self.name.clone(),
            source: e.into(),
        })?;

        let mut context =
            SceneContext::new(&self.name, &mut self.resources, &self.objects, &self.container);
        self.behaviour
            .load(&mut context)
            .map_err(|source| EngineError::SceneLoad {
                scene: self.name.clone(),
                source,
            })?;

        self.state = SceneState::Loaded;
        log::info!(
            "Scene '{}' loaded in {:.2} ms",
            self.name,
            watch.elapsed_ms_f64()
        );
        Ok(())
    }

    /// Marks a loaded instance active and runs its start hook.
    pub fn start(&mut self) {
        if self.state != SceneState::Loaded {
            log::warn!(
                "Ignoring start of scene '{}' in state {:?}",
                self.name,
                self.state
            );
            return;
        }
        self.state = SceneState::Active;
        let mut context =
            SceneContext::new(&self.name, &mut self.resources, &self.objects, &self.container);
        self.behaviour.start(&mut context);
    }

    /// Ticks the scene, then its objects.
    pub fn tick(&mut self, delta: f64) -> anyhow::Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let mut context =
            SceneContext::new(&self.name, &mut self.resources, &self.objects, &self.container);
        self.behaviour.tick(&mut context, delta)?;
        self.objects.tick(delta);
        Ok(())
    }

    /// Draws the scene, its objects back to front, then its overlay.
    pub fn render(&mut self, frame: &mut dyn DrawTarget, debug: bool) -> anyhow::Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.behaviour.render(frame, debug)?;
        self.objects.render(frame);
        self.behaviour.render_overlay(frame, debug)
    }

    /// Forwards a viewport change to a loaded scene.
    pub fn refresh(&mut self, viewport: &Viewport) {
        if self.is_loaded() {
            self.behaviour.refresh(viewport);
        }
    }

    /// Kills the scene, its objects and its resources. Idempotent.
    pub fn kill(&mut self) {
        match self.state {
            SceneState::Dead => return,
            SceneState::Unloaded => {}
            _ => self.behaviour.kill(),
        }
        self.objects.kill();
        self.resources.kill();
        self.state = SceneState::Dead;
        log::debug!("Scene '{}' killed.", self.name);
    }
}
