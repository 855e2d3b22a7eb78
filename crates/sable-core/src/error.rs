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

//! Defines the error types surfaced by the engine core.

use crate::resource::ResourceKind;
use thiserror::Error;

/// Errors raised by scene management, the container and configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No scene was registered under the requested name.
    #[error("scene '{0}' is not registered")]
    SceneNotRegistered(String),

    /// A scene with the same (case-insensitive) name already exists.
    #[error("scene '{0}' is already registered")]
    DuplicateScene(String),

    /// A scene failed while loading its resources or content.
    #[error("failed to load scene '{scene}': {source}")]
    SceneLoad {
        /// The name the scene was being loaded under.
        scene: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// A scene instance was asked to load a second time, or after it was killed.
    #[error("scene '{0}' cannot be loaded again")]
    SceneReused(String),

    /// A resource loader failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// An engine thread could not be spawned.
    #[error("failed to spawn engine thread: {0}")]
    Thread(#[from] std::io::Error),

    /// The engine configuration could not be read or was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`ResourceLoader`](crate::resource::ResourceLoader).
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The loader was killed; its tables are gone.
    #[error("resource loader has been killed")]
    LoaderKilled,

    /// Two producers published the same name for the same kind.
    #[error("duplicate {kind} resource '{name}'")]
    DuplicateResource {
        /// The kind the name collided in.
        kind: ResourceKind,
        /// The normalized resource name.
        name: String,
    },

    /// A producer failed to build its resources.
    #[error("producer '{producer}' failed: {source}")]
    Producer {
        /// Type name of the failing producer.
        producer: &'static str,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while reading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config document is not valid JSON for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
