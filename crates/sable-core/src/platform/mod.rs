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

//! Presentation backends.
//!
//! The container draws through [`PresentationSurface`], an injected strategy
//! so that any windowing backend can host the engine. [`HeadlessSurface`]
//! records frames in memory.

mod headless;
mod surface;
mod viewport;

pub use headless::{DrawCommand, FrameRecorder, HeadlessSurface, RECORDED_FRAMES};
pub use surface::{DrawTarget, PresentationSurface};
pub use viewport::Viewport;
