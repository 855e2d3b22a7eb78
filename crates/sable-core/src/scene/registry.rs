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

use super::Scene;
use crate::error::EngineError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh scene for each transition.
pub type SceneFactory = Arc<dyn Fn() -> Box<dyn Scene> + Send + Sync>;

/// A registered scene: the main scene and the optional loading scene shown
/// while it loads.
#[derive(Clone)]
pub struct SceneEntry {
    name: String,
    main: SceneFactory,
    loading: Option<SceneFactory>,
}

impl SceneEntry {
    /// The name as it was registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a loading scene is shown during the transition.
    pub fn has_loading_scene(&self) -> bool {
        self.loading.is_some()
    }

    pub(crate) fn build_main(&self) -> Box<dyn Scene> {
        (self.main)()
    }

    pub(crate) fn build_loading(&self) -> Option<Box<dyn Scene>> {
        self.loading.as_ref().map(|factory| factory())
    }
}

impl fmt::Debug for SceneEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneEntry")
            .field("name", &self.name)
            .field("loading", &self.loading.is_some())
            .finish()
    }
}

/// Scenes by case-insensitive name.
#[derive(Default)]
pub struct SceneRegistry {
    entries: HashMap<String, SceneEntry>,
}

impl SceneRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene. Fails if the name is taken, ignoring case.
    pub fn add(
        &mut self,
        name: &str,
        main: SceneFactory,
        loading: Option<SceneFactory>,
    ) -> Result<(), EngineError> {
        let key = name.to_lowercase();
        if self.entries.contains_key(&key) {
            return Err(EngineError::DuplicateScene(name.to_string()));
        }
        log::debug!(
            "Registered scene '{name}'{}",
            if loading.is_some() { " with loading scene" } else { "" }
        );
        self.entries.insert(
            key,
            SceneEntry {
                name: name.to_string(),
                main,
                loading,
            },
        );
        Ok(())
    }

    /// Looks a scene up, ignoring case.
    pub fn get(&self, name: &str) -> Result<&SceneEntry, EngineError> {
        self.entries
            .get(&name.to_lowercase())
            .ok_or_else(|| EngineError::SceneNotRegistered(name.to_string()))
    }

    /// Whether a scene is registered under `name`, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// Number of registered scenes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no scene is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
