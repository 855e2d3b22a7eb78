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

/// Maps world units to surface pixels.
///
/// A fixed number of units always spans the surface width; the height in
/// units follows from the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Units across the surface width.
    pub units_wide: f32,
    /// Pixels per world unit.
    pub pixels_per_unit: f32,
}

impl Viewport {
    /// Computes the ratio for a surface size.
    pub fn new(width: u32, height: u32, units_wide: f32) -> Self {
        let pixels_per_unit = if units_wide > 0.0 {
            width as f32 / units_wide
        } else {
            1.0
        };
        Self {
            width,
            height,
            units_wide,
            pixels_per_unit,
        }
    }

    /// Units across the surface height.
    pub fn units_high(&self) -> f32 {
        if self.pixels_per_unit > 0.0 {
            self.height as f32 / self.pixels_per_unit
        } else {
            0.0
        }
    }

    /// Converts a length in units to pixels.
    pub fn to_pixels(&self, units: f32) -> f32 {
        units * self.pixels_per_unit
    }

    /// Converts a length in pixels to units.
    pub fn to_units(&self, pixels: f32) -> f32 {
        if self.pixels_per_unit > 0.0 {
            pixels / self.pixels_per_unit
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_follows_width() {
        let viewport = Viewport::new(1280, 720, 16.0);
        assert_eq!(viewport.pixels_per_unit, 80.0);
        assert_eq!(viewport.units_high(), 9.0);
        assert_eq!(viewport.to_pixels(2.0), 160.0);
        assert_eq!(viewport.to_units(40.0), 0.5);
    }

    #[test]
    fn test_zero_width_surface() {
        let viewport = Viewport::new(0, 100, 16.0);
        assert_eq!(viewport.pixels_per_unit, 0.0);
        assert_eq!(viewport.units_high(), 0.0);
    }
}
