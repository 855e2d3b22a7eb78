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

use super::{DrawTarget, PresentationSurface};
use crate::math::{Color, Rect};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How many presented frames a [`FrameRecorder`] keeps.
pub const RECORDED_FRAMES: usize = 120;

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// `clear`
    Clear(Color),
    /// `fill_rect`
    FillRect(Rect, Color),
    /// `draw_text`
    Text {
        /// The text drawn.
        text: String,
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
    },
}

#[derive(Debug, Default)]
struct Recording {
    frames: VecDeque<Vec<DrawCommand>>,
    presented: usize,
    buffer_creations: u32,
}

impl Recording {
    fn push(&mut self, commands: Vec<DrawCommand>) {
        if self.frames.len() == RECORDED_FRAMES {
            self.frames.pop_front();
        }
        self.frames.push_back(commands);
        self.presented += 1;
    }
}

/// A cloneable view on what a [`HeadlessSurface`] presented.
///
/// Only the last [`RECORDED_FRAMES`] frames are kept; the count covers all of them.
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    inner: Arc<Mutex<Recording>>,
}

impl FrameRecorder {
    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of presented frames.
    pub fn frame_count(&self) -> usize {
        self.lock().presented
    }

    /// Commands of the most recently presented frame.
    pub fn last_frame(&self) -> Option<Vec<DrawCommand>> {
        self.lock().frames.back().cloned()
    }

    /// Commands of the retained frames, oldest first.
    pub fn frames(&self) -> Vec<Vec<DrawCommand>> {
        self.lock().frames.iter().cloned().collect()
    }

    /// How many times a buffer chain was created.
    pub fn buffer_creations(&self) -> u32 {
        self.lock().buffer_creations
    }

    /// Every text drawn in the most recent frame.
    pub fn last_frame_texts(&self) -> Vec<String> {
        self.last_frame()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct FrameBuffer {
    commands: Vec<DrawCommand>,
}

impl DrawTarget for FrameBuffer {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect(rect, color));
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, _color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
        });
    }
}

/// A surface that keeps presented frames in memory instead of showing them.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    fullscreen: bool,
    buffers: Option<u32>,
    buffers_available: bool,
    frame: FrameBuffer,
    recorder: FrameRecorder,
}

impl HeadlessSurface {
    /// Creates a surface of the given size without buffers.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fullscreen: false,
            buffers: None,
            buffers_available: true,
            frame: FrameBuffer::default(),
            recorder: FrameRecorder::default(),
        }
    }

    /// A handle for inspecting presented frames after the surface is moved.
    pub fn recorder(&self) -> FrameRecorder {
        self.recorder.clone()
    }

    /// Makes `create_buffers` fail, mimicking a window that is not shown yet.
    pub fn with_buffers_unavailable(mut self) -> Self {
        self.buffers_available = false;
        self
    }

    /// Whether the surface is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl PresentationSurface for HeadlessSurface {
    fn create_buffers(&mut self, count: u32) -> bool {
        if !self.buffers_available || count == 0 {
            return false;
        }
        self.buffers = Some(count);
        self.recorder.lock().buffer_creations += 1;
        true
    }

    fn has_buffers(&self) -> bool {
        self.buffers.is_some()
    }

    fn begin_frame(&mut self) -> Option<&mut dyn DrawTarget> {
        self.buffers?;
        self.frame.commands.clear();
        Some(&mut self.frame)
    }

    fn present(&mut self) {
        let commands = std::mem::take(&mut self.frame.commands);
        self.recorder.lock().push(commands);
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.buffers = None;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
        self.buffers = None;
    }
}
