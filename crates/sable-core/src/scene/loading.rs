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

use super::{Scene, SceneContext};
use crate::math::Color;
use crate::platform::{DrawTarget, Viewport};

const DOT_PERIOD: f64 = 0.25;
const MAX_DOTS: usize = 3;

/// A lightweight loading scene: a centred label followed by cycling dots.
pub struct LoadingIndicator {
    label: String,
    background: Color,
    foreground: Color,
    elapsed: f64,
    center: (f32, f32),
}

impl LoadingIndicator {
    /// Shows "Loading".
    pub fn new() -> Self {
        Self::with_label("Loading")
    }

    /// Shows a custom label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            background: Color::BLACK,
            foreground: Color::WHITE,
            elapsed: 0.0,
            center: (0.0, 0.0),
        }
    }

    /// Overrides the colors.
    pub fn with_colors(mut self, background: Color, foreground: Color) -> Self {
        self.background = background;
        self.foreground = foreground;
        self
    }

    /// The text drawn this frame.
    pub fn text(&self) -> String {
        let dots = (self.elapsed / DOT_PERIOD) as usize % (MAX_DOTS + 1);
        format!("{}{}", self.label, ".".repeat(dots))
    }
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for LoadingIndicator {
    fn load(&mut self, _context: &mut SceneContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn tick(&mut self, _context: &mut SceneContext<'_>, delta: f64) -> anyhow::Result<()> {
        self.elapsed += delta;
        Ok(())
    }

    fn render(&mut self, frame: &mut dyn DrawTarget, _debug: bool) -> anyhow::Result<()> {
        frame.clear(self.background);
        frame.draw_text(&self.text(), self.center.0, self.center.1, self.foreground);
        Ok(())
    }

    fn refresh(&mut self, viewport: &Viewport) {
        self.center = (viewport.width as f32 / 2.0, viewport.height as f32 / 2.0);
    }
}
