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

use anyhow::Result;
use sable_core::config::{EngineConfig, LoopConfig};
use sable_core::container::Container;
use sable_core::math::{Color, Rect};
use sable_core::object::{
    Collider, ColliderRole, GameObject, Killable, ObjectId, Renderable, Tickable,
};
use sable_core::platform::{DrawTarget, HeadlessSurface, Viewport};
use sable_core::resource::{Loadable, ResourceHandle, ResourceKind, ResourceLoader, ResourceMap};
use sable_core::scene::{LoadingIndicator, Scene, SceneContext};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TITLE_SECONDS: f64 = 1.0;
const LEVEL_SECONDS: f64 = 3.0;

/// Pixels per world unit, shared by a level and its objects.
#[derive(Clone, Default)]
struct Scale(Arc<AtomicU32>);

impl Scale {
    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, pixels_per_unit: f32) {
        self.0.store(pixels_per_unit.to_bits(), Ordering::Relaxed);
    }

    fn to_pixels(&self, bounds: Rect) -> Rect {
        let ratio = self.get();
        Rect::new(
            bounds.x * ratio,
            bounds.y * ratio,
            bounds.width * ratio,
            bounds.height * ratio,
        )
    }
}

/// Publishes the level's colors.
struct Palette;

impl Loadable for Palette {
    fn load_objects(&self, _context: &str) -> Result<ResourceMap> {
        Ok(ResourceMap::from([
            ("ball".to_string(), ResourceHandle::new(Color::rgb(230, 80, 60))),
            ("coin".to_string(), ResourceHandle::new(Color::rgb(250, 210, 40))),
        ]))
    }
}

#[derive(Default)]
struct Title {
    elapsed: f64,
    requested: bool,
}

impl Scene for Title {
    fn load(&mut self, _context: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn tick(&mut self, context: &mut SceneContext<'_>, delta: f64) -> Result<()> {
        self.elapsed += delta;
        if self.elapsed >= TITLE_SECONDS && !self.requested {
            self.requested = true;
            context.container().request_scene("level")?;
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut dyn DrawTarget, _debug: bool) -> Result<()> {
        frame.clear(Color::BLACK);
        frame.draw_text("SABLE", 16.0, 16.0, Color::WHITE);
        Ok(())
    }
}

struct Ball {
    bounds: Rect,
    speed: f32,
    color: Color,
    scale: Scale,
    collected: u32,
}

impl Tickable for Ball {
    fn tick(&mut self, delta: f64) -> Result<()> {
        self.bounds.x += self.speed * delta as f32;
        Ok(())
    }
}

impl Renderable for Ball {
    fn z_order(&self) -> i32 {
        1
    }

    fn render(&mut self, frame: &mut dyn DrawTarget) -> Result<()> {
        frame.fill_rect(self.scale.to_pixels(self.bounds), self.color);
        Ok(())
    }
}

impl Collider for Ball {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn role(&self) -> ColliderRole {
        ColliderRole::Active
    }

    fn on_collision(&mut self, other: ObjectId, _other_bounds: Rect) {
        self.collected += 1;
        log::debug!("Ball touched coin {other}");
    }
}

impl GameObject for Ball {
    fn as_tickable(&mut self) -> Option<&mut dyn Tickable> {
        Some(self)
    }

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn as_collider(&mut self) -> Option<&mut dyn Collider> {
        Some(self)
    }
}

struct Coin {
    bounds: Rect,
    color: Color,
    scale: Scale,
    taken: bool,
}

impl Renderable for Coin {
    fn render(&mut self, frame: &mut dyn DrawTarget) -> Result<()> {
        if !self.taken {
            frame.fill_rect(self.scale.to_pixels(self.bounds), self.color);
        }
        Ok(())
    }
}

impl Collider for Coin {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn role(&self) -> ColliderRole {
        ColliderRole::Passive
    }

    fn on_collision(&mut self, _other: ObjectId, _other_bounds: Rect) {
        self.taken = true;
    }
}

impl Killable for Coin {
    fn kill(&mut self) {
        log::trace!("Coin released (taken: {}).", self.taken);
    }
}

impl GameObject for Coin {
    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn as_killable(&mut self) -> Option<&mut dyn Killable> {
        Some(self)
    }

    fn as_collider(&mut self) -> Option<&mut dyn Collider> {
        Some(self)
    }
}

#[derive(Default)]
struct Level {
    elapsed: f64,
    scale: Scale,
    ball: Option<Arc<Mutex<Ball>>>,
}

impl Scene for Level {
    fn register_loadables(&mut self, resources: &mut ResourceLoader) {
        resources.register(Palette);
    }

    fn load(&mut self, context: &mut SceneContext<'_>) -> Result<()> {
        // Stands in for reading a level file.
        std::thread::sleep(Duration::from_millis(300));

        let ball_color = context
            .resources()
            .get_as::<Color>(ResourceKind::Object, "BALL")?
            .map_or(Color::WHITE, |color| *color);
        let coin_color = context
            .resources()
            .get_as::<Color>(ResourceKind::Object, "coin")?
            .map_or(Color::WHITE, |color| *color);

        let (_, ball) = context.objects().spawn(Ball {
            bounds: Rect::new(0.0, 4.0, 1.0, 1.0),
            speed: 4.0,
            color: ball_color,
            scale: self.scale.clone(),
            collected: 0,
        });
        self.ball = Some(ball);
        for i in 1..=5 {
            context.objects().spawn(Coin {
                bounds: Rect::new(i as f32 * 2.0, 4.25, 0.5, 0.5),
                color: coin_color,
                scale: self.scale.clone(),
                taken: false,
            });
        }
        log::info!("Level '{}' holds {} objects.", context.name(), context.objects().len());
        Ok(())
    }

    fn tick(&mut self, context: &mut SceneContext<'_>, delta: f64) -> Result<()> {
        self.elapsed += delta;
        if self.elapsed >= LEVEL_SECONDS {
            if let Some(ball) = &self.ball {
                let collected = ball.lock().map(|ball| ball.collected).unwrap_or_default();
                log::info!("Ball touched coins {collected} times.");
            }
            context.container().exit();
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut dyn DrawTarget, _debug: bool) -> Result<()> {
        frame.clear(Color::rgb(20, 24, 40));
        Ok(())
    }

    fn refresh(&mut self, viewport: &Viewport) {
        self.scale.set(viewport.pixels_per_unit);
    }
}

fn main() -> Result<()> {
    sable_infra::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig {
            timing: LoopConfig {
                desired_fps: 60,
                ..LoopConfig::default()
            },
            debug: true,
            ..EngineConfig::default()
        },
    };
    let surface = HeadlessSurface::new(config.display.width, config.display.height);
    let recorder = surface.recorder();

    let container = Container::builder(config)
        .surface(surface)
        .on_exit(|| log::info!("Sandbox finished."))
        .build()?;
    container.add_scene("title", || Box::new(Title::default()) as Box<dyn Scene>)?;
    container.add_scene_with_loading(
        "level",
        || Box::new(Level::default()) as Box<dyn Scene>,
        || Box::new(LoadingIndicator::new()) as Box<dyn Scene>,
    )?;
    container.driver().on_fps_update(|fps| log::trace!("fps: {fps}"));

    container.request_scene("title")?;
    container.run()?;
    container.wait();

    log::info!("Presented {} frames.", recorder.frame_count());
    Ok(())
}
