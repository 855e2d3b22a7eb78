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

//! Extension points a game plugs into its container.

use crate::math::Color;
use crate::platform::{DrawTarget, Viewport};

/// Background audio that follows the container's pause state.
pub trait AmbientAudio: Send {
    /// The container was paused.
    fn pause(&mut self);

    /// The container was resumed.
    fn resume(&mut self);
}

/// Runs once, at the end of [`Container::exit`](super::Container::exit).
///
/// Binaries typically terminate the process here.
pub trait ExitHandler: Send {
    /// Called after the loop has stopped and the current scene is dead.
    fn on_exit(&mut self);
}

impl<F: FnMut() + Send> ExitHandler for F {
    fn on_exit(&mut self) {
        self()
    }
}

/// What an overlay can see of the container when it draws.
#[derive(Debug, Clone, Copy)]
pub struct OverlayContext {
    /// The fps measured over the last window.
    pub fps: u32,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// The container's debug flag.
    pub debug: bool,
    /// The current unit/pixel mapping.
    pub viewport: Viewport,
}

/// Container-level drawing run after the scene, every frame.
pub trait OverlayRenderer: Send {
    /// Draws on top of the finished scene.
    fn render(&mut self, frame: &mut dyn DrawTarget, context: &OverlayContext) -> anyhow::Result<()>;
}

impl<F> OverlayRenderer for F
where
    F: FnMut(&mut dyn DrawTarget, &OverlayContext) -> anyhow::Result<()> + Send,
{
    fn render(&mut self, frame: &mut dyn DrawTarget, context: &OverlayContext) -> anyhow::Result<()> {
        self(frame, context)
    }
}

/// Draws the measured fps in the top-left corner while debugging.
pub struct FpsOverlay {
    color: Color,
}

impl FpsOverlay {
    /// An overlay in the given color.
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Default for FpsOverlay {
    fn default() -> Self {
        Self::new(Color::rgb(255, 255, 0))
    }
}

impl OverlayRenderer for FpsOverlay {
    fn render(&mut self, frame: &mut dyn DrawTarget, context: &OverlayContext) -> anyhow::Result<()> {
        if context.debug {
            let label = if context.paused {
                format!("FPS: {} (paused)", context.fps)
            } else {
                format!("FPS: {}", context.fps)
            };
            frame.draw_text(&label, 4.0, 4.0, self.color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HeadlessSurface, PresentationSurface};

    fn context(debug: bool) -> OverlayContext {
        OverlayContext {
            fps: 58,
            paused: false,
            debug,
            viewport: Viewport::new(100, 100, 10.0),
        }
    }

    #[test]
    fn test_fps_overlay_only_draws_in_debug() {
        let mut surface = HeadlessSurface::new(100, 100);
        let recorder = surface.recorder();
        surface.create_buffers(1);
        let mut overlay = FpsOverlay::default();

        if let Some(frame) = surface.begin_frame() {
            overlay.render(frame, &context(false)).unwrap();
        }
        surface.present();
        assert!(recorder.last_frame_texts().is_empty());

        if let Some(frame) = surface.begin_frame() {
            overlay.render(frame, &context(true)).unwrap();
        }
        surface.present();
        assert_eq!(recorder.last_frame_texts(), vec!["FPS: 58"]);
    }

    #[test]
    fn test_closures_are_exit_handlers() {
        let mut called = 0;
        {
            let mut handler = || called += 1;
            ExitHandler::on_exit(&mut handler);
        }
        assert_eq!(called, 1);
    }
}
