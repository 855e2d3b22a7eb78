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

//! # Sable Core
//!
//! The runtime nucleus of the Sable 2D engine:
//! * [`clock`]: timing primitives and the tick/render loop driver
//! * [`scene`]: scene lifecycle, registry and the transition controller
//! * [`container`]: the owner of the presentation surface and the loop
//! * [`resource`]: per-scene resource tables built from `Loadable` producers
//! * [`object`]: per-scene tick/render/collision dispatch
//! * [`input`]: the input dispatch contract and its default implementation
//! * [`platform`]: presentation surface contract and a headless backend

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod input;
pub mod math;
pub mod object;
pub mod platform;
pub mod resource;
pub mod scene;
pub mod utils;

pub use config::EngineConfig;
pub use container::{Container, ContainerHandle};
pub use error::{EngineError, ResourceError};
pub use utils::timer::Stopwatch;
