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

//! The container: owner of the presentation surface, the loop and the scenes.
//!
//! The [`LoopDriver`] calls [`Container::tick`] and [`Container::render`] on
//! its own thread. Scene transitions requested from anywhere are carried out
//! at the end of `render`, after the frame has been presented, so a frame
//! never sees a half-swapped scene.

mod handle;
mod hooks;

pub use handle::ContainerHandle;
pub use hooks::{AmbientAudio, ExitHandler, FpsOverlay, OverlayContext, OverlayRenderer};

use crate::clock::{Clock, LoopDriver, LoopTarget, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::{InputDispatch, InputState};
use crate::platform::{HeadlessSurface, PresentationSurface, Viewport};
use crate::scene::{Scene, SceneDirector, SceneFactory, SharedScene};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

/// Builds a [`Container`]. Every collaborator has a default.
pub struct ContainerBuilder {
    config: EngineConfig,
    surface: Option<Box<dyn PresentationSurface>>,
    clock: Option<Arc<dyn Clock>>,
    input: Option<Arc<dyn InputDispatch>>,
    audio: Option<Box<dyn AmbientAudio>>,
    overlays: Vec<Box<dyn OverlayRenderer>>,
    exit_handler: Option<Box<dyn ExitHandler>>,
}

impl ContainerBuilder {
    /// The presentation backend. Defaults to a [`HeadlessSurface`] of the configured size.
    pub fn surface(mut self, surface: impl PresentationSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    /// The time source for the loop. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The input dispatch collaborator. Defaults to a fresh [`InputState`].
    pub fn input(mut self, input: Arc<dyn InputDispatch>) -> Self {
        self.input = Some(input);
        self
    }

    /// Audio paused and resumed with the container.
    pub fn audio(mut self, audio: impl AmbientAudio + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    /// Adds an overlay drawn after the scene.
    pub fn overlay(mut self, overlay: impl OverlayRenderer + 'static) -> Self {
        self.overlays.push(Box::new(overlay));
        self
    }

    /// Runs at the end of [`Container::exit`].
    pub fn on_exit(mut self, handler: impl ExitHandler + 'static) -> Self {
        self.exit_handler = Some(Box::new(handler));
        self
    }

    /// Validates the configuration and assembles the container.
    pub fn build(self) -> Result<Arc<Container>, EngineError> {
        self.config.validate()?;
        let display = &self.config.display;

        let mut surface = self
            .surface
            .unwrap_or_else(|| Box::new(HeadlessSurface::new(display.width, display.height)));
        if display.fullscreen {
            surface.set_fullscreen(true);
        }
        let (width, height) = surface.size();
        let viewport = Viewport::new(width, height, display.units_wide);

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let input = self
            .input
            .unwrap_or_else(|| Arc::new(InputState::new()));
        let mut overlays = self.overlays;
        if self.config.debug {
            overlays.push(Box::new(FpsOverlay::default()));
        }
        let config = self.config;
        let audio = self.audio;
        let exit_handler = self.exit_handler;

        let container = Arc::new_cyclic(|me: &Weak<Container>| {
            let target: Weak<dyn LoopTarget> = me.clone();
            Container {
                handle: ContainerHandle::new(me.clone()),
                driver: LoopDriver::new(target, clock, &config.timing),
                director: SceneDirector::new(config.resources.producer_dedup),
                surface: Mutex::new(surface),
                viewport: Mutex::new(viewport),
                refresh_pending: AtomicBool::new(false),
                input,
                audio: Mutex::new(audio),
                overlays: Mutex::new(overlays),
                exit_handler: Mutex::new(exit_handler),
                paused: AtomicBool::new(false),
                can_render: AtomicBool::new(true),
                exiting: AtomicBool::new(false),
                exit_requested: AtomicBool::new(false),
                dispatch_thread: Mutex::new(None),
                render_released: (Mutex::new(false), Condvar::new()),
                config,
            }
        });
        log::info!(
            "Container created ({}x{}, {} tps).",
            viewport.width,
            viewport.height,
            container.config.timing.ticks_per_second
        );
        Ok(container)
    }
}

/// Owns the presentation surface, the loop driver and the scene director.
pub struct Container {
    handle: ContainerHandle,
    config: EngineConfig,
    driver: LoopDriver,
    director: SceneDirector,
    surface: Mutex<Box<dyn PresentationSurface>>,
    viewport: Mutex<Viewport>,
    refresh_pending: AtomicBool,
    input: Arc<dyn InputDispatch>,
    audio: Mutex<Option<Box<dyn AmbientAudio>>>,
    overlays: Mutex<Vec<Box<dyn OverlayRenderer>>>,
    exit_handler: Mutex<Option<Box<dyn ExitHandler>>>,
    paused: AtomicBool,
    can_render: AtomicBool,
    exiting: AtomicBool,
    exit_requested: AtomicBool,
    dispatch_thread: Mutex<Option<ThreadId>>,
    render_released: (Mutex<bool>, Condvar),
}

impl Container {
    /// Starts building a container around `config`.
    pub fn builder(config: EngineConfig) -> ContainerBuilder {
        ContainerBuilder {
            config,
            surface: None,
            clock: None,
            input: None,
            audio: None,
            overlays: Vec::new(),
            exit_handler: None,
        }
    }

    /// A container with every collaborator defaulted.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>, EngineError> {
        Self::builder(config).build()
    }

    /// A non-owning handle to this container.
    pub fn handle(&self) -> ContainerHandle {
        self.handle.clone()
    }

    /// The configuration the container was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The loop driver, for rate changes and fps listeners.
    pub fn driver(&self) -> &LoopDriver {
        &self.driver
    }

    /// The input dispatch collaborator.
    pub fn input(&self) -> Arc<dyn InputDispatch> {
        Arc::clone(&self.input)
    }

    // --- Scenes ---

    /// Registers a scene under a case-insensitive name.
    pub fn add_scene<F>(&self, name: &str, main: F) -> Result<(), EngineError>
    where
        F: Fn() -> Box<dyn Scene> + Send + Sync + 'static,
    {
        self.director.add_scene(name, Arc::new(main), None)
    }

    /// Registers a scene together with the loading scene shown while it loads.
    pub fn add_scene_with_loading<F, L>(
        &self,
        name: &str,
        main: F,
        loading: L,
    ) -> Result<(), EngineError>
    where
        F: Fn() -> Box<dyn Scene> + Send + Sync + 'static,
        L: Fn() -> Box<dyn Scene> + Send + Sync + 'static,
    {
        let loading: SceneFactory = Arc::new(loading);
        self.director.add_scene(name, Arc::new(main), Some(loading))
    }

    /// Asks for a transition at the end of the next render.
    ///
    /// Unregistered names fail immediately. A later request replaces one that
    /// has not started yet.
    pub fn request_scene(&self, name: &str) -> Result<(), EngineError> {
        self.director.request_scene(name)?;
        log::debug!("Scene '{name}' requested.");
        Ok(())
    }

    /// Whether a requested transition has not started yet.
    pub fn has_pending_transition(&self) -> bool {
        self.director.has_pending_transition()
    }

    /// Whether a main scene is loading in the background.
    pub fn is_loading_scene(&self) -> bool {
        self.director.is_loading()
    }

    /// The current scene, which may be a loading scene.
    pub fn current_scene(&self) -> Option<SharedScene> {
        self.director.current()
    }

    /// Name of the current scene.
    pub fn current_scene_name(&self) -> Option<String> {
        self.director.current_name()
    }

    // --- Loop ---

    /// Starts the loop thread. Returns `false` if it was already running.
    pub fn run(&self) -> Result<bool, EngineError> {
        Ok(self.driver.start()?)
    }

    /// Blocks until the loop thread has exited.
    pub fn wait(&self) {
        self.driver.join();
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    /// Sets the desired fps, `-1` for uncapped.
    pub fn set_frame_rate(&self, fps: i32) {
        self.driver.set_frame_rate(fps);
    }

    /// Sets the simulation rate. Returns `false` if the value was rejected.
    pub fn set_ticks_per_second(&self, ticks_per_second: f64) -> bool {
        self.driver.set_ticks_per_second(ticks_per_second)
    }

    /// The fps measured over the last window.
    pub fn fps(&self) -> u32 {
        self.driver.fps()
    }

    /// Halts the simulation. Rendering and input observation continue, and
    /// ambient audio follows the flag.
    pub fn set_paused(&self, paused: bool) {
        if self.paused.swap(paused, Ordering::SeqCst) == paused {
            return;
        }
        if let Some(audio) = lock(&self.audio).as_mut() {
            if paused {
                audio.pause();
            } else {
                audio.resume();
            }
        }
        log::debug!("Container {}.", if paused { "paused" } else { "resumed" });
    }

    /// Whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// One simulation step: input first, then the current scene unless paused.
    pub fn tick(&self, delta: f64) -> anyhow::Result<()> {
        let _dispatch = self.enter_dispatch();
        self.input.check_key_changes();
        self.input.check_hover();

        if !self.is_paused() {
            if let Some(scene) = self.director.current() {
                let result = lock(&scene).tick(delta);
                if let Err(e) = result {
                    self.fail(e);
                    return Ok(());
                }
            }
        }
        self.service_exit_request();
        Ok(())
    }

    /// Draws and presents one frame, then runs any finished load or pending
    /// transition.
    pub fn render(&self) -> anyhow::Result<()> {
        if !self.can_render.load(Ordering::SeqCst) {
            self.release_render();
            return Ok(());
        }
        let _dispatch = self.enter_dispatch();

        let viewport = *lock(&self.viewport);
        if self.refresh_pending.swap(false, Ordering::SeqCst) {
            self.director.refresh(&viewport);
        }

        match self.draw_frame(&viewport) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                self.fail(e);
                return Ok(());
            }
        }

        // Safe point: the frame is presented and no scene lock is held.
        let transition = self
            .director
            .poll_loaded(&viewport)
            .and_then(|()| self.director.perform_pending(&self.handle, &viewport));
        if let Err(e) = transition {
            self.fail(e.into());
            return Ok(());
        }
        self.service_exit_request();
        Ok(())
    }

    /// Returns `Ok(false)` when no buffer was available this frame.
    fn draw_frame(&self, viewport: &Viewport) -> anyhow::Result<bool> {
        let mut surface = lock(&self.surface);
        if !surface.has_buffers() && !surface.create_buffers(self.config.display.buffer_count) {
            log::debug!("Presentation buffers unavailable; skipping frame.");
            return Ok(false);
        }
        let Some(frame) = surface.begin_frame() else {
            return Ok(false);
        };

        let mut result = Ok(());
        if let Some(scene) = self.director.current() {
            result = lock(&scene).render(frame, self.config.debug);
        }

        let context = OverlayContext {
            fps: self.driver.fps(),
            paused: self.is_paused(),
            debug: self.config.debug,
            viewport: *viewport,
        };
        for overlay in lock(&self.overlays).iter_mut() {
            if let Err(e) = overlay.render(frame, &context) {
                log::error!("Overlay failed to render: {e:#}");
            }
        }

        surface.present();
        result.map(|()| true)
    }

    // --- Surface ---

    /// The current unit/pixel mapping.
    pub fn viewport(&self) -> Viewport {
        *lock(&self.viewport)
    }

    /// Resizes the surface. Buffers are recreated on the next frame, and the
    /// current scene is refreshed before it draws again.
    pub fn resize(&self, width: u32, height: u32) {
        let size = {
            let mut surface = lock(&self.surface);
            surface.resize(width, height);
            surface.size()
        };
        self.update_viewport(size);
    }

    /// Enters or leaves fullscreen.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        let size = {
            let mut surface = lock(&self.surface);
            surface.set_fullscreen(fullscreen);
            surface.size()
        };
        self.update_viewport(size);
    }

    fn update_viewport(&self, (width, height): (u32, u32)) {
        let viewport = Viewport::new(width, height, self.config.display.units_wide);
        *lock(&self.viewport) = viewport;
        self.refresh_pending.store(true, Ordering::SeqCst);
        log::debug!(
            "Viewport is now {width}x{height} ({:.2} px/unit).",
            viewport.pixels_per_unit
        );
    }

    // --- Shutdown ---

    /// Whether [`exit`](Self::exit) has been called.
    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    /// Stops rendering, waits a bounded time for the renderer to notice, stops
    /// the loop, kills the current scene and runs the exit handler.
    ///
    /// Must not be called from inside a scene hook; use
    /// [`ContainerHandle::exit`] there.
    pub fn exit(&self) {
        if self.exiting.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Container exiting.");
        self.can_render.store(false, Ordering::SeqCst);

        if self.driver.is_running() && !self.driver.is_loop_thread() {
            let timeout = self.config.exit_timeout();
            let (released, signal) = &self.render_released;
            let guard = lock(released);
            let (_guard, wait) = signal
                .wait_timeout_while(guard, timeout, |released| !*released)
                .unwrap_or_else(PoisonError::into_inner);
            if wait.timed_out() {
                log::warn!("Renderer did not release within {timeout:?}; exiting anyway.");
            }
        }

        self.driver.stop();
        self.driver.join();
        self.director.shutdown();
        if let Some(audio) = lock(&self.audio).as_mut() {
            audio.pause();
        }

        let handler = lock(&self.exit_handler).take();
        if let Some(mut handler) = handler {
            handler.on_exit();
        }
    }

    /// Exits now, or right after the current tick or render when called from
    /// inside one.
    pub(crate) fn request_exit(&self) {
        if self.in_dispatch() {
            self.exit_requested.store(true, Ordering::SeqCst);
        } else {
            self.exit();
        }
    }

    fn service_exit_request(&self) {
        if self.exit_requested.swap(false, Ordering::SeqCst) {
            self.exit();
        }
    }

    fn fail(&self, error: anyhow::Error) {
        log::error!("Fatal scene error: {error:#}");
        self.exit();
    }

    fn release_render(&self) {
        let (released, signal) = &self.render_released;
        *lock(released) = true;
        signal.notify_all();
    }

    fn enter_dispatch(&self) -> DispatchGuard<'_> {
        *lock(&self.dispatch_thread) = Some(thread::current().id());
        DispatchGuard(&self.dispatch_thread)
    }

    fn in_dispatch(&self) -> bool {
        *lock(&self.dispatch_thread) == Some(thread::current().id())
    }
}

impl LoopTarget for Container {
    fn tick(&self, delta: f64) -> anyhow::Result<()> {
        Container::tick(self, delta)
    }

    fn render(&self) -> anyhow::Result<()> {
        Container::render(self)
    }
}

/// Marks the calling thread as inside a tick or render until dropped.
struct DispatchGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
