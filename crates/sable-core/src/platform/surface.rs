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

use crate::math::{Color, Rect};

/// Something scenes and objects can draw onto for the current frame.
pub trait DrawTarget {
    /// Fills the whole frame.
    fn clear(&mut self, color: Color);

    /// Fills a rectangle, in pixels.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draws a line of text with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, color: Color);
}

/// A multi-buffered presentation surface owned by the container.
///
/// Resizing or switching fullscreen invalidates the buffers; the container
/// recreates them lazily on the next frame.
pub trait PresentationSurface: Send {
    /// Creates the buffer chain. Returns `false` if the surface is not ready yet.
    fn create_buffers(&mut self, count: u32) -> bool;

    /// Whether a buffer chain currently exists.
    fn has_buffers(&self) -> bool;

    /// Starts a frame and hands out its drawable, `None` if no buffer is available.
    fn begin_frame(&mut self) -> Option<&mut dyn DrawTarget>;

    /// Flips the frame started by `begin_frame` to the screen.
    fn present(&mut self);

    /// Current size in pixels.
    fn size(&self) -> (u32, u32);

    /// Changes the size, dropping the buffer chain.
    fn resize(&mut self, width: u32, height: u32);

    /// Enters or leaves fullscreen, dropping the buffer chain.
    fn set_fullscreen(&mut self, fullscreen: bool);
}
