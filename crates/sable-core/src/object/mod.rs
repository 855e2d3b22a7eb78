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

//! Per-scene entity dispatch.
//!
//! A [`GameObject`] advertises the capabilities it supports through its
//! `as_*` accessors. The [`ObjectHandler`] files each object into one list per
//! capability and drives tick, render and collision over those lists.

mod handler;

pub use handler::ObjectHandler;

use crate::math::Rect;
use crate::platform::DrawTarget;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Identifier handed out by an [`ObjectHandler`] when an object is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An object shared between gameplay code and the handler.
pub type SharedObject = Arc<Mutex<dyn GameObject>>;

/// Anything that lives in a scene.
///
/// Every accessor defaults to `None`; an object that overrides none of them is
/// accepted by the handler but never dispatched to.
pub trait GameObject: Send + 'static {
    /// Simulation updates.
    fn as_tickable(&mut self) -> Option<&mut dyn Tickable> {
        None
    }

    /// Drawing.
    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    /// Teardown when the owning scene dies.
    fn as_killable(&mut self) -> Option<&mut dyn Killable> {
        None
    }

    /// Participation in collision checks.
    fn as_collider(&mut self) -> Option<&mut dyn Collider> {
        None
    }
}

/// Updated once per tick.
pub trait Tickable {
    /// Advances the object by `delta` seconds of simulation.
    fn tick(&mut self, delta: f64) -> anyhow::Result<()>;
}

/// Drawn once per render pass, back to front.
pub trait Renderable {
    /// Depth key. Lower values are drawn first.
    fn z_order(&self) -> i32 {
        0
    }

    /// Draws the object onto the current frame.
    fn render(&mut self, frame: &mut dyn DrawTarget) -> anyhow::Result<()>;
}

/// Released when the owning scene is killed.
pub trait Killable {
    /// Releases whatever the object holds.
    fn kill(&mut self);
}

/// The side an object plays in collision checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderRole {
    /// Initiates checks against passive colliders.
    Active,
    /// Is checked against by active colliders.
    Passive,
    /// Both of the above.
    Both,
}

impl ColliderRole {
    pub(crate) fn is_active(self) -> bool {
        matches!(self, ColliderRole::Active | ColliderRole::Both)
    }

    pub(crate) fn is_passive(self) -> bool {
        matches!(self, ColliderRole::Passive | ColliderRole::Both)
    }
}

/// An axis-aligned collision participant.
pub trait Collider {
    /// Current bounds, in world units.
    fn bounds(&self) -> Rect;

    /// Which checks the object takes part in. Read once, when the object is added.
    fn role(&self) -> ColliderRole;

    /// Called when this object overlaps `other`.
    fn on_collision(&mut self, other: ObjectId, other_bounds: Rect);
}
