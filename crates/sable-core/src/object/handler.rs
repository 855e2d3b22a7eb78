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

use super::{GameObject, ObjectId, SharedObject};
use crate::math::Rect;
use crate::platform::DrawTarget;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Clone)]
struct Entry {
    id: ObjectId,
    object: SharedObject,
}

/// A copy-on-write list: readers iterate a snapshot while writers swap in a new one.
#[derive(Default)]
struct Membership {
    entries: RwLock<Arc<Vec<Entry>>>,
}

impl Membership {
    fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, edit: impl FnOnce(&mut Vec<Entry>)) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().clone();
        edit(&mut next);
        *guard = Arc::new(next);
    }

    /// Replaces the list only if nobody changed it since `expected` was taken.
    fn replace_if_unchanged(&self, expected: &Arc<Vec<Entry>>, next: Vec<Entry>) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if Arc::ptr_eq(&guard, expected) {
            *guard = Arc::new(next);
        }
    }

    fn remove(&self, id: ObjectId) -> bool {
        let mut removed = false;
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed = entries.len() != before;
        });
        removed
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn clear(&self) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Vec::new());
    }
}

/// Dispatches tick, render and collision to the objects of one scene.
///
/// Membership may change from any thread while a pass is running; each pass
/// works on the lists as they were when it began. A failing object is logged
/// and skipped, the rest of the pass continues.
#[derive(Default)]
pub struct ObjectHandler {
    next_id: AtomicU64,
    all: Membership,
    tickables: Membership,
    renderables: Membership,
    killables: Membership,
    active_colliders: Membership,
    passive_colliders: Membership,
}

impl ObjectHandler {
    /// Creates an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shared object and files it under every capability it exposes.
    pub fn add(&self, object: SharedObject) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tickable, renderable, killable, role) = {
            let mut guard = lock(&object);
            (
                guard.as_tickable().is_some(),
                guard.as_renderable().is_some(),
                guard.as_killable().is_some(),
                guard.as_collider().map(|collider| collider.role()),
            )
        };

        let entry = Entry { id, object };
        self.all.update(|entries| entries.push(entry.clone()));
        if tickable {
            self.tickables.update(|entries| entries.push(entry.clone()));
        }
        if renderable {
            self.renderables.update(|entries| entries.push(entry.clone()));
        }
        if killable {
            self.killables.update(|entries| entries.push(entry.clone()));
        }
        if let Some(role) = role {
            if role.is_active() {
                self.active_colliders.update(|entries| entries.push(entry.clone()));
            }
            if role.is_passive() {
                self.passive_colliders.update(|entries| entries.push(entry.clone()));
            }
        }
        log::trace!("Added object {id}");
        id
    }

    /// Wraps `object`, adds it, and returns both the id and a typed handle to it.
    pub fn spawn<T: GameObject>(&self, object: T) -> (ObjectId, Arc<Mutex<T>>) {
        let typed = Arc::new(Mutex::new(object));
        let shared: SharedObject = typed.clone();
        (self.add(shared), typed)
    }

    /// Removes an object from every list. Returns `false` if it was not present.
    pub fn remove(&self, id: ObjectId) -> bool {
        let removed = self.all.remove(id);
        if removed {
            self.tickables.remove(id);
            self.renderables.remove(id);
            self.killables.remove(id);
            self.active_colliders.remove(id);
            self.passive_colliders.remove(id);
        }
        removed
    }

    /// Whether the object is currently held.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.all.snapshot().iter().any(|entry| entry.id == id)
    }

    /// The object registered under `id`.
    pub fn get(&self, id: ObjectId) -> Option<SharedObject> {
        self.all
            .snapshot()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| Arc::clone(&entry.object))
    }

    /// Number of objects, inert ones included.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether the handler holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tickable objects.
    pub fn tickable_count(&self) -> usize {
        self.tickables.len()
    }

    /// Number of renderable objects.
    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Number of objects in (active, passive) collision roles.
    pub fn collider_counts(&self) -> (usize, usize) {
        (self.active_colliders.len(), self.passive_colliders.len())
    }

    /// Ticks every tickable, then runs collision checks.
    ///
    /// No ordering between tickables is promised.
    pub fn tick(&self, delta: f64) {
        for entry in self.tickables.snapshot().iter() {
            let mut guard = lock(&entry.object);
            if let Some(tickable) = guard.as_tickable() {
                if let Err(e) = tickable.tick(delta) {
                    log::error!("Object {} failed to tick: {e:#}", entry.id);
                }
            }
        }
        self.check_collisions();
    }

    /// Tests every active collider against every passive one and notifies both
    /// sides of each overlap. O(active x passive).
    pub fn check_collisions(&self) {
        let active_snapshot = self.active_colliders.snapshot();
        let active = collider_bounds(&active_snapshot);
        if active.is_empty() {
            return;
        }
        let passive_snapshot = self.passive_colliders.snapshot();
        let passive = collider_bounds(&passive_snapshot);

        let mut hits = Vec::new();
        for (a, a_bounds) in &active {
            for (p, p_bounds) in &passive {
                if Arc::ptr_eq(&a.object, &p.object) {
                    continue;
                }
                if a_bounds.intersects(p_bounds) {
                    hits.push((a, *a_bounds, p, *p_bounds));
                }
            }
        }

        // One object lock at a time, so two colliders never wait on each other.
        for (a, a_bounds, p, p_bounds) in hits {
            notify_collision(a, p.id, p_bounds);
            notify_collision(p, a.id, a_bounds);
        }
    }

    /// Draws renderables in ascending z-order. Ties keep insertion order.
    pub fn render(&self, frame: &mut dyn DrawTarget) {
        let snapshot = self.renderables.snapshot();
        let mut ordered: Vec<(i32, Entry)> = snapshot
            .iter()
            .map(|entry| {
                let z = lock(&entry.object)
                    .as_renderable()
                    .map_or(0, |renderable| renderable.z_order());
                (z, entry.clone())
            })
            .collect();
        ordered.sort_by_key(|(z, _)| *z);

        for (_, entry) in &ordered {
            let mut guard = lock(&entry.object);
            if let Some(renderable) = guard.as_renderable() {
                if let Err(e) = renderable.render(frame) {
                    log::error!("Object {} failed to render: {e:#}", entry.id);
                }
            }
        }

        self.renderables.replace_if_unchanged(
            &snapshot,
            ordered.into_iter().map(|(_, entry)| entry).collect(),
        );
    }

    /// Kills every killable object, then forgets all objects.
    pub fn kill(&self) {
        let killables = self.killables.snapshot();
        for entry in killables.iter() {
            if let Some(killable) = lock(&entry.object).as_killable() {
                killable.kill();
            }
        }
        self.all.clear();
        self.tickables.clear();
        self.renderables.clear();
        self.killables.clear();
        self.active_colliders.clear();
        self.passive_colliders.clear();
        log::debug!("Object handler killed {} objects.", killables.len());
    }
}

fn collider_bounds(entries: &[Entry]) -> Vec<(&Entry, Rect)> {
    entries
        .iter()
        .filter_map(|entry| {
            lock(&entry.object)
                .as_collider()
                .map(|collider| (entry, collider.bounds()))
        })
        .collect()
}

fn notify_collision(entry: &Entry, other: ObjectId, other_bounds: Rect) {
    if let Some(collider) = lock(&entry.object).as_collider() {
        collider.on_collision(other, other_bounds);
    }
}

fn lock(object: &SharedObject) -> MutexGuard<'_, dyn GameObject> {
    object.lock().unwrap_or_else(PoisonError::into_inner)
}
