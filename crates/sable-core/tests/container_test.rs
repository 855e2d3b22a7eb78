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

//! Integration tests for the container's tick/render orchestration and the
//! scene transition protocol it drives.

use sable_core::container::{AmbientAudio, Container};
use sable_core::input::InputDispatch;
use sable_core::math::Color;
use sable_core::platform::{DrawTarget, FrameRecorder, HeadlessSurface, Viewport};
use sable_core::scene::{LoadingIndicator, Scene, SceneContext};
use sable_core::{ContainerHandle, EngineConfig, EngineError};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

type Events = Arc<Mutex<Vec<String>>>;

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(events: &Events, event: impl Into<String>) {
    events.lock().unwrap().push(event.into());
}

fn snapshot(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

fn position(events: &[String], event: &str) -> Option<usize> {
    events.iter().position(|e| e == event)
}

/// A scene that records its lifecycle and draws its name.
#[derive(Clone)]
struct Spy {
    name: &'static str,
    events: Events,
    fail_load: bool,
    gate: Option<Arc<AtomicBool>>,
    request_on_render: Option<&'static str>,
    exit_on_tick: bool,
    fail_tick: bool,
    fail_render: Arc<AtomicBool>,
    handle: Option<ContainerHandle>,
}

impl Spy {
    fn new(name: &'static str, events: &Events) -> Self {
        Self {
            name,
            events: Arc::clone(events),
            fail_load: false,
            gate: None,
            request_on_render: None,
            exit_on_tick: false,
            fail_tick: false,
            fail_render: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    fn factory(self) -> impl Fn() -> Box<dyn Scene> + Send + Sync + 'static {
        move || Box::new(self.clone()) as Box<dyn Scene>
    }
}

impl Scene for Spy {
    fn load(&mut self, context: &mut SceneContext<'_>) -> anyhow::Result<()> {
        if let Some(gate) = &self.gate {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !gate.load(Ordering::SeqCst) && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
        }
        record(&self.events, format!("load {}", self.name));
        anyhow::ensure!(!self.fail_load, "{} is corrupt", self.name);
        self.handle = Some(context.container().clone());
        Ok(())
    }

    fn start(&mut self, _context: &mut SceneContext<'_>) {
        record(&self.events, format!("start {}", self.name));
    }

    fn tick(&mut self, context: &mut SceneContext<'_>, _delta: f64) -> anyhow::Result<()> {
        record(&self.events, format!("tick {}", self.name));
        if self.exit_on_tick {
            context.container().exit();
        }
        anyhow::ensure!(!self.fail_tick, "{} lost its state", self.name);
        Ok(())
    }

    fn render(&mut self, frame: &mut dyn DrawTarget, _debug: bool) -> anyhow::Result<()> {
        record(&self.events, format!("render {}", self.name));
        frame.draw_text(self.name, 0.0, 0.0, Color::WHITE);
        anyhow::ensure!(
            !self.fail_render.load(Ordering::SeqCst),
            "{} cannot draw",
            self.name
        );
        if let (Some(next), Some(handle)) = (self.request_on_render.take(), &self.handle) {
            handle.request_scene(next)?;
        }
        Ok(())
    }

    fn kill(&mut self) {
        record(&self.events, format!("kill {}", self.name));
    }

    fn refresh(&mut self, viewport: &Viewport) {
        record(
            &self.events,
            format!("refresh {} {}", self.name, viewport.pixels_per_unit),
        );
    }
}

#[derive(Default)]
struct CountingInput {
    key_checks: AtomicU32,
    hover_checks: AtomicU32,
}

impl InputDispatch for CountingInput {
    fn check_key_changes(&self) {
        self.key_checks.fetch_add(1, Ordering::SeqCst);
    }

    fn check_hover(&self) {
        self.hover_checks.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordingAudio(Events);

impl AmbientAudio for RecordingAudio {
    fn pause(&mut self) {
        record(&self.0, "audio paused");
    }

    fn resume(&mut self) {
        record(&self.0, "audio resumed");
    }
}

struct Harness {
    container: Arc<Container>,
    recorder: FrameRecorder,
    input: Arc<CountingInput>,
    exited: Arc<AtomicBool>,
}

fn harness(config: EngineConfig, surface: HeadlessSurface, audio: Option<&Events>) -> Harness {
    let recorder = surface.recorder();
    let input = Arc::new(CountingInput::default());
    let exited = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&exited);
    let mut builder = Container::builder(config)
        .surface(surface)
        .input(input.clone())
        .on_exit(move || flag.store(true, Ordering::SeqCst));
    if let Some(events) = audio {
        builder = builder.audio(RecordingAudio(Arc::clone(events)));
    }
    Harness {
        container: builder.build().unwrap(),
        recorder,
        input,
        exited,
    }
}

fn default_harness() -> Harness {
    harness(EngineConfig::default(), HeadlessSurface::new(320, 160), None)
}

/// Renders until the condition holds, failing after a generous timeout.
fn render_until(container: &Container, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        container.render().unwrap();
        thread::sleep(Duration::from_millis(1));
    }
}

fn activate(container: &Container, name: &str) {
    container.request_scene(name).unwrap();
    render_until(container, || {
        container.current_scene_name().as_deref() == Some(name) && !container.is_loading_scene()
    });
}

#[test]
fn test_pause_halts_scene_ticks_but_not_input_or_render() {
    let log = events();
    let h = harness(
        EngineConfig::default(),
        HeadlessSurface::new(320, 160),
        Some(&log),
    );
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    activate(&h.container, "a");

    h.container.tick(0.016).unwrap();
    h.container.set_paused(true);
    let frames = h.recorder.frame_count();
    for _ in 0..3 {
        h.container.tick(0.016).unwrap();
        h.container.render().unwrap();
    }

    let seen = snapshot(&log);
    assert_eq!(seen.iter().filter(|e| *e == "tick a").count(), 1);
    assert_eq!(h.input.key_checks.load(Ordering::SeqCst), 4);
    assert_eq!(h.input.hover_checks.load(Ordering::SeqCst), 4);
    assert_eq!(h.recorder.frame_count(), frames + 3);
    assert_eq!(h.recorder.last_frame_texts(), vec!["a"]);
    assert!(seen.contains(&"audio paused".to_string()));

    h.container.set_paused(false);
    h.container.tick(0.016).unwrap();
    let seen = snapshot(&log);
    assert_eq!(seen.iter().filter(|e| *e == "tick a").count(), 2);
    assert_eq!(seen.last().map(String::as_str), Some("tick a"));
    assert!(seen.contains(&"audio resumed".to_string()));
}

#[test]
fn test_request_during_render_swaps_only_after_that_render() {
    let log = events();
    let h = default_harness();
    let mut a = Spy::new("a", &log);
    a.request_on_render = Some("b");
    h.container.add_scene("a", a.factory()).unwrap();
    h.container.add_scene("b", Spy::new("b", &log).factory()).unwrap();
    activate(&h.container, "a");

    render_until(&h.container, || {
        h.container.current_scene_name().as_deref() == Some("b")
    });
    render_until(&h.container, || h.recorder.last_frame_texts() == vec!["b"]);

    let seen = snapshot(&log);
    let kills: Vec<_> = seen.iter().filter(|e| *e == "kill a").collect();
    assert_eq!(kills.len(), 1);
    let kill_a = position(&seen, "kill a").unwrap();
    let last_render_a = seen.iter().rposition(|e| e == "render a").unwrap();
    let start_b = position(&seen, "start b").unwrap();
    assert!(last_render_a < kill_a);
    assert!(kill_a < start_b);
    assert!(position(&seen, "load b").unwrap() < start_b);
}

#[test]
fn test_loading_scene_is_rendered_while_main_scene_loads() {
    let log = events();
    let gate = Arc::new(AtomicBool::new(false));
    let h = default_harness();
    let mut b = Spy::new("b", &log);
    b.gate = Some(Arc::clone(&gate));
    h.container
        .add_scene_with_loading("b", b.factory(), || {
            Box::new(LoadingIndicator::new()) as Box<dyn Scene>
        })
        .unwrap();

    h.container.request_scene("b").unwrap();
    h.container.render().unwrap();
    assert!(h.container.is_loading_scene());
    h.container.render().unwrap();

    let texts = h.recorder.last_frame_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Loading"));
    assert!(!snapshot(&log).contains(&"start b".to_string()));

    gate.store(true, Ordering::SeqCst);
    render_until(&h.container, || h.recorder.last_frame_texts() == vec!["b"]);
    assert!(!h.container.is_loading_scene());
}

#[test]
fn test_failed_load_takes_the_exit_path() {
    let log = events();
    let h = default_harness();
    let mut broken = Spy::new("broken", &log);
    broken.fail_load = true;
    h.container.add_scene("broken", broken.factory()).unwrap();

    h.container.request_scene("broken").unwrap();
    render_until(&h.container, || h.exited.load(Ordering::SeqCst));

    assert!(h.container.is_exiting());
    assert!(h.container.current_scene().is_none());
    assert!(snapshot(&log).contains(&"kill broken".to_string()));

    // Rendering after exit draws nothing.
    let frames = h.recorder.frame_count();
    h.container.render().unwrap();
    assert_eq!(h.recorder.frame_count(), frames);
}

#[test]
fn test_unregistered_scene_is_rejected() {
    let h = default_harness();
    assert!(matches!(
        h.container.request_scene("nowhere"),
        Err(EngineError::SceneNotRegistered(name)) if name == "nowhere"
    ));
    assert!(h.container.handle().request_scene("nowhere").is_err());
    assert!(!h.container.has_pending_transition());
}

#[test]
fn test_later_request_supersedes_pending_one() {
    let log = events();
    let h = default_harness();
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    h.container.add_scene("b", Spy::new("b", &log).factory()).unwrap();

    h.container.request_scene("a").unwrap();
    h.container.request_scene("B").unwrap();
    render_until(&h.container, || {
        h.container.current_scene_name().as_deref() == Some("b")
    });

    assert!(!snapshot(&log).contains(&"load a".to_string()));
}

#[test]
fn test_resize_refreshes_current_scene() {
    let log = events();
    let h = default_harness();
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    activate(&h.container, "a");
    assert!(snapshot(&log).contains(&"refresh a 20".to_string()));
    let creations = h.recorder.buffer_creations();

    h.container.resize(640, 480);
    assert_eq!(h.container.viewport().pixels_per_unit, 40.0);
    h.container.render().unwrap();

    assert!(snapshot(&log).contains(&"refresh a 40".to_string()));
    assert_eq!(h.recorder.buffer_creations(), creations + 1);
}

#[test]
fn test_frame_is_skipped_without_buffers() {
    let log = events();
    let h = harness(
        EngineConfig::default(),
        HeadlessSurface::new(320, 160).with_buffers_unavailable(),
        None,
    );
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    h.container.request_scene("a").unwrap();

    h.container.render().unwrap();
    assert_eq!(h.recorder.frame_count(), 0);
    assert!(h.container.has_pending_transition());
}

#[test]
fn test_scene_can_exit_from_its_own_tick() {
    let log = events();
    let h = default_harness();
    let mut quitter = Spy::new("quitter", &log);
    quitter.exit_on_tick = true;
    h.container.add_scene("quitter", quitter.factory()).unwrap();
    activate(&h.container, "quitter");

    h.container.tick(0.016).unwrap();
    assert!(h.exited.load(Ordering::SeqCst));
    assert!(snapshot(&log).contains(&"kill quitter".to_string()));
}

#[test]
fn test_running_container_exits_from_another_thread() {
    let log = events();
    let mut config = EngineConfig::default();
    config.timing.ticks_per_second = 200.0;
    let h = harness(config, HeadlessSurface::new(320, 160), None);
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    h.container.request_scene("a").unwrap();

    assert!(h.container.run().unwrap());
    assert!(!h.container.run().unwrap());
    let deadline = Instant::now() + Duration::from_secs(5);
    while !snapshot(&log).contains(&"tick a".to_string()) {
        assert!(Instant::now() < deadline, "scene never ticked");
        thread::sleep(Duration::from_millis(5));
    }

    h.container.exit();
    assert!(h.exited.load(Ordering::SeqCst));
    assert!(!h.container.is_running());
    assert_eq!(
        snapshot(&log).iter().filter(|e| *e == "kill a").count(),
        1
    );
}

#[test]
fn test_debug_config_draws_fps_overlay() {
    let log = events();
    let config = EngineConfig {
        debug: true,
        ..EngineConfig::default()
    };
    let h = harness(config, HeadlessSurface::new(320, 160), None);
    h.container.add_scene("a", Spy::new("a", &log).factory()).unwrap();
    activate(&h.container, "a");
    h.container.render().unwrap();

    assert_eq!(h.recorder.last_frame_texts(), vec!["a", "FPS: 0"]);
}

#[test]
fn test_handle_refers_back_to_its_container() {
    let h = default_harness();
    let handle = h.container.handle();
    assert!(handle.is_attached());
    assert!(Arc::ptr_eq(&handle.upgrade().unwrap(), &h.container));
}

#[test]
fn test_scene_tick_error_exits() {
    let log = events();
    let h = default_harness();
    let mut faulty = Spy::new("faulty", &log);
    faulty.fail_tick = true;
    h.container.add_scene("faulty", faulty.factory()).unwrap();
    activate(&h.container, "faulty");

    h.container.tick(0.016).unwrap();

    assert!(h.exited.load(Ordering::SeqCst));
    assert!(h.container.is_exiting());
    assert!(h.container.current_scene().is_none());
    assert!(snapshot(&log).contains(&"kill faulty".to_string()));
}

#[test]
fn test_scene_render_error_exits() {
    let log = events();
    let h = default_harness();
    let faulty = Spy::new("faulty", &log);
    let fail_render = Arc::clone(&faulty.fail_render);
    h.container.add_scene("faulty", faulty.factory()).unwrap();
    activate(&h.container, "faulty");
    assert!(!h.exited.load(Ordering::SeqCst));

    fail_render.store(true, Ordering::SeqCst);
    h.container.render().unwrap();

    assert!(h.exited.load(Ordering::SeqCst));
    assert!(snapshot(&log).contains(&"kill faulty".to_string()));
}

#[test]
fn test_exit_gives_up_on_a_render_that_never_comes() {
    let mut config = EngineConfig::default();
    config.exit_timeout_ms = 100;
    config.timing.desired_fps = 1;
    let h = harness(config, HeadlessSurface::new(320, 160), None);

    assert!(h.container.run().unwrap());
    thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    h.container.exit();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "returned after {elapsed:?}");
    assert!(h.exited.load(Ordering::SeqCst));
    assert!(!h.container.is_running());
    assert_eq!(h.recorder.frame_count(), 0);
}
