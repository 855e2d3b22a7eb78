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

use super::{InputDispatch, InputEvent, Key, MouseButton};
use crate::event::EventBus;
use crate::math::Rect;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// Something that wants to know when the cursor enters or leaves it.
pub trait HoverTarget: Send + Sync {
    /// The area, in surface pixels, that counts as hovered.
    fn hover_bounds(&self) -> Rect;

    /// Called when the hovered state flips.
    fn on_hover_changed(&self, hovered: bool);
}

/// Maps named actions to the keys that trigger them.
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    actions: HashMap<String, Vec<Key>>,
}

impl KeyBindings {
    /// Creates an empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `action`. Action names are case-insensitive.
    pub fn bind(&mut self, action: &str, key: Key) {
        let keys = self.actions.entry(action.to_lowercase()).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Removes every binding of `action`.
    pub fn unbind(&mut self, action: &str) {
        self.actions.remove(&action.to_lowercase());
    }

    /// Keys bound to `action`.
    pub fn keys_for(&self, action: &str) -> &[Key] {
        self.actions
            .get(&action.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
struct Keyboard {
    held: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,
    buttons_held: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    cursor: Option<(f32, f32)>,
    scroll: (f32, f32),
}

struct HoverEntry {
    target: Weak<dyn HoverTarget>,
    hovered: bool,
}

/// The default [`InputDispatch`]: queued events folded into per-tick state.
///
/// Backends publish through [`sender`](Self::sender) from any thread. The
/// "pressed"/"released" sets describe the changes seen by the latest
/// [`check_key_changes`](InputDispatch::check_key_changes).
pub struct InputState {
    events: EventBus<InputEvent>,
    keyboard: Mutex<Keyboard>,
    bindings: RwLock<KeyBindings>,
    hover_targets: Mutex<Vec<HoverEntry>>,
}

impl InputState {
    /// Creates an empty input state.
    pub fn new() -> Self {
        Self {
            events: EventBus::new(),
            keyboard: Mutex::new(Keyboard::default()),
            bindings: RwLock::new(KeyBindings::new()),
            hover_targets: Mutex::new(Vec::new()),
        }
    }

    /// A sender the platform backend publishes raw events through.
    pub fn sender(&self) -> flume::Sender<InputEvent> {
        self.events.sender()
    }

    /// Queues a single event.
    pub fn publish(&self, event: InputEvent) {
        self.events.publish(event);
    }

    /// Replaces the action bindings.
    pub fn set_bindings(&self, bindings: KeyBindings) {
        *self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = bindings;
    }

    /// Binds one more key to an action.
    pub fn bind(&self, action: &str, key: Key) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .bind(action, key);
    }

    /// Registers a hover target. It is dropped from the list once the last
    /// strong reference to it goes away.
    pub fn add_hover_target(&self, target: &Arc<dyn HoverTarget>) {
        lock(&self.hover_targets).push(HoverEntry {
            target: Arc::downgrade(target),
            hovered: false,
        });
    }

    /// Whether `key` is down.
    pub fn is_key_held(&self, key: Key) -> bool {
        lock(&self.keyboard).held.contains(&key)
    }

    /// Whether `key` went down since the previous check.
    pub fn was_key_pressed(&self, key: Key) -> bool {
        lock(&self.keyboard).pressed.contains(&key)
    }

    /// Whether `key` went up since the previous check.
    pub fn was_key_released(&self, key: Key) -> bool {
        lock(&self.keyboard).released.contains(&key)
    }

    /// Whether `button` is down.
    pub fn is_button_held(&self, button: MouseButton) -> bool {
        lock(&self.keyboard).buttons_held.contains(&button)
    }

    /// Whether `button` went down since the previous check.
    pub fn was_button_pressed(&self, button: MouseButton) -> bool {
        lock(&self.keyboard).buttons_pressed.contains(&button)
    }

    /// Last known cursor position, `None` when outside the surface.
    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        lock(&self.keyboard).cursor
    }

    /// Scroll accumulated since the previous check.
    pub fn scroll_delta(&self) -> (f32, f32) {
        lock(&self.keyboard).scroll
    }

    /// Whether any key bound to `action` is down.
    pub fn is_action_held(&self, action: &str) -> bool {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let keyboard = lock(&self.keyboard);
        bindings
            .keys_for(action)
            .iter()
            .any(|key| keyboard.held.contains(key))
    }

    /// Whether any key bound to `action` went down since the previous check.
    pub fn was_action_pressed(&self, action: &str) -> bool {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let keyboard = lock(&self.keyboard);
        bindings
            .keys_for(action)
            .iter()
            .any(|key| keyboard.pressed.contains(key))
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDispatch for InputState {
    fn check_key_changes(&self) {
        let mut keyboard = lock(&self.keyboard);
        keyboard.pressed.clear();
        keyboard.released.clear();
        keyboard.buttons_pressed.clear();
        keyboard.scroll = (0.0, 0.0);

        for event in self.events.drain() {
            match event {
                InputEvent::KeyPressed(key) => {
                    if keyboard.held.insert(key) {
                        keyboard.pressed.insert(key);
                    }
                }
                InputEvent::KeyReleased(key) => {
                    if keyboard.held.remove(&key) {
                        keyboard.released.insert(key);
                    }
                }
                InputEvent::MousePressed(button) => {
                    if keyboard.buttons_held.insert(button) {
                        keyboard.buttons_pressed.insert(button);
                    }
                }
                InputEvent::MouseReleased(button) => {
                    keyboard.buttons_held.remove(&button);
                }
                InputEvent::CursorMoved { x, y } => keyboard.cursor = Some((x, y)),
                InputEvent::CursorLeft => keyboard.cursor = None,
                InputEvent::Scrolled { delta_x, delta_y } => {
                    keyboard.scroll.0 += delta_x;
                    keyboard.scroll.1 += delta_y;
                }
            }
        }
    }

    fn check_hover(&self) {
        let cursor = lock(&self.keyboard).cursor;
        let mut changes = Vec::new();
        {
            let mut targets = lock(&self.hover_targets);
            targets.retain(|entry| entry.target.strong_count() > 0);
            for entry in targets.iter_mut() {
                let Some(target) = entry.target.upgrade() else {
                    continue;
                };
                let bounds = target.hover_bounds();
                let hovered = cursor.is_some_and(|(x, y)| bounds.contains(x, y));
                if hovered != entry.hovered {
                    entry.hovered = hovered;
                    changes.push((target, hovered));
                }
            }
        }
        // Notified outside the lock so targets may register further targets.
        for (target, hovered) in changes {
            target.on_hover_changed(hovered);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
