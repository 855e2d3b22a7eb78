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

//! Input dispatch contract and the engine's input vocabulary.
//!
//! Platform backends translate raw device events into [`InputEvent`]s and
//! publish them; the container calls [`InputDispatch`] once per tick, even while
//! paused, so input observation continues when the simulation does not.

mod state;

pub use state::{HoverTarget, InputState, KeyBindings};

/// Called by the container on every tick, paused or not.
pub trait InputDispatch: Send + Sync {
    /// Folds queued key and button events into the current input state.
    fn check_key_changes(&self);

    /// Recomputes which hover targets lie under the cursor and notifies changes.
    fn check_hover(&self);
}

macro_rules! declare_keys {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every key the engine understands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum Key {
            $($variant),*
        }

        impl Key {
            /// All supported keys, in declaration order.
            pub const ALL: &'static [Key] = &[$(Key::$variant),*];

            /// Stable name of the key, as used in bindings.
            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$variant => $name),*
                }
            }
        }
    };
}

declare_keys! {
    A => "A", B => "B", C => "C", D => "D", E => "E", F => "F", G => "G",
    H => "H", I => "I", J => "J", K => "K", L => "L", M => "M", N => "N",
    O => "O", P => "P", Q => "Q", R => "R", S => "S", T => "T", U => "U",
    V => "V", W => "W", X => "X", Y => "Y", Z => "Z",
    Digit0 => "0", Digit1 => "1", Digit2 => "2", Digit3 => "3", Digit4 => "4",
    Digit5 => "5", Digit6 => "6", Digit7 => "7", Digit8 => "8", Digit9 => "9",
    Up => "UP", Down => "DOWN", Left => "LEFT", Right => "RIGHT",
    Space => "SPACE", Enter => "ENTER", Escape => "ESCAPE", Tab => "TAB",
    Backspace => "BACKSPACE",
    ShiftLeft => "LSHIFT", ShiftRight => "RSHIFT",
    ControlLeft => "LCONTROL", ControlRight => "RCONTROL",
    AltLeft => "LALT", AltRight => "RALT",
    F1 => "F1", F2 => "F2", F3 => "F3", F4 => "F4", F5 => "F5", F6 => "F6",
    F7 => "F7", F8 => "F8", F9 => "F9", F10 => "F10", F11 => "F11", F12 => "F12",
}

impl Key {
    /// Looks a key up by its name, ignoring case.
    pub fn from_name(name: &str) -> Option<Key> {
        Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// The left mouse button.
    Left,
    /// The right mouse button.
    Right,
    /// The middle mouse button.
    Middle,
    /// Any other button, by backend code.
    Other(u16),
}

/// A backend-agnostic input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key went down. Auto-repeat is filtered out by the backend.
    KeyPressed(Key),
    /// A key went up.
    KeyReleased(Key),
    /// A mouse button went down.
    MousePressed(MouseButton),
    /// A mouse button went up.
    MouseReleased(MouseButton),
    /// The cursor moved, in surface pixels.
    CursorMoved {
        /// Horizontal position.
        x: f32,
        /// Vertical position.
        y: f32,
    },
    /// The cursor left the surface.
    CursorLeft,
    /// The wheel scrolled.
    Scrolled {
        /// Horizontal delta.
        delta_x: f32,
        /// Vertical delta.
        delta_y: f32,
    },
}
