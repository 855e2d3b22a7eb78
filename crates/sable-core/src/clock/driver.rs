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

use super::{Clock, FrameTimer, NANOS_PER_SECOND};
use crate::config::LoopConfig;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// The callbacks a [`LoopDriver`] invokes.
///
/// Returning an error from either callback stops the loop; the error is logged.
pub trait LoopTarget: Send + Sync {
    /// Advances the simulation by one fixed step of `delta` seconds.
    fn tick(&self, delta: f64) -> anyhow::Result<()>;

    /// Draws and presents one frame.
    fn render(&self) -> anyhow::Result<()>;
}

type FpsListener = Box<dyn FnMut(u32) + Send>;

/// State shared between the driver handle and its loop thread.
struct DriverShared {
    running: AtomicBool,
    paused: AtomicBool,
    generation: AtomicU64,
    fps: AtomicU32,
    timer: Mutex<FrameTimer>,
    fps_listener: Mutex<Option<FpsListener>>,
    /// The live loop thread, tagged with the generation that spawned it.
    loop_thread: Mutex<Option<(u64, ThreadId)>>,
}

/// Runs the tick/render cadence on a dedicated thread.
///
/// The driver holds its target weakly, so a target may own its driver. The
/// loop ends when [`stop`](Self::stop) is called, when the target is dropped,
/// or when a callback fails.
pub struct LoopDriver {
    shared: Arc<DriverShared>,
    target: Weak<dyn LoopTarget>,
    clock: Arc<dyn Clock>,
    idle_sleep: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LoopDriver {
    /// Creates a stopped driver.
    pub fn new(target: Weak<dyn LoopTarget>, clock: Arc<dyn Clock>, config: &LoopConfig) -> Self {
        Self {
            shared: Arc::new(DriverShared {
                running: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                fps: AtomicU32::new(0),
                timer: Mutex::new(FrameTimer::new(config)),
                fps_listener: Mutex::new(None),
                loop_thread: Mutex::new(None),
            }),
            target,
            clock,
            idle_sleep: Duration::from_micros(config.idle_sleep_micros),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the loop thread. Returns `Ok(false)` if the loop was already running.
    pub fn start(&self) -> std::io::Result<bool> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Loop driver already running; start ignored.");
            return Ok(false);
        }

        // A previous loop thread that is still finishing its last iteration sees
        // the new generation and exits instead of resuming.
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let target = self.target.clone();
        let clock = Arc::clone(&self.clock);
        let idle_sleep = self.idle_sleep;
        let started_at = clock.now_nanos();

        let spawned = thread::Builder::new()
            .name("sable-loop".to_string())
            .spawn(move || run_loop(shared, target, clock, generation, started_at, idle_sleep));

        match spawned {
            Ok(handle) => {
                *lock(&self.handle) = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Asks the loop to exit. An in-flight tick or render is allowed to finish.
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            log::info!("Loop driver stop requested.");
        }
    }

    /// Waits for the loop thread to exit. Does nothing when called from the loop thread.
    pub fn join(&self) {
        if self.is_loop_thread() {
            return;
        }
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Loop driver thread panicked.");
            }
        }
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether the caller is executing on the loop thread.
    pub fn is_loop_thread(&self) -> bool {
        lock(&self.shared.loop_thread).is_some_and(|(_, id)| id == thread::current().id())
    }

    /// Skips tick callbacks while paused; rendering continues.
    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
    }

    /// Whether tick callbacks are being skipped.
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Sets the simulation rate. Returns `false` if the value was rejected.
    pub fn set_ticks_per_second(&self, ticks_per_second: f64) -> bool {
        lock(&self.shared.timer).set_ticks_per_second(ticks_per_second)
    }

    /// Sets the desired fps, `-1` for uncapped.
    pub fn set_frame_rate(&self, fps: i32) {
        lock(&self.shared.timer).set_frame_rate(fps);
    }

    /// Sets the length of the fps measurement window, in seconds.
    pub fn set_fps_update_rate(&self, seconds: f64) -> bool {
        lock(&self.shared.timer).set_fps_update_rate(seconds)
    }

    /// Registers a callback invoked on the loop thread each time fps is measured.
    pub fn on_fps_update(&self, listener: impl FnMut(u32) + Send + 'static) {
        *lock(&self.shared.fps_listener) = Some(Box::new(listener));
    }

    /// The fps measured over the last window.
    pub fn fps(&self) -> u32 {
        self.shared.fps.load(Ordering::Relaxed)
    }

    /// The current render interval, in seconds.
    pub fn render_interval(&self) -> f64 {
        lock(&self.shared.timer).render_interval()
    }
}

impl Drop for LoopDriver {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_loop(
    shared: Arc<DriverShared>,
    target: Weak<dyn LoopTarget>,
    clock: Arc<dyn Clock>,
    generation: u64,
    started_at: u64,
    idle_sleep: Duration,
) {
    {
        let mut slot = lock(&shared.loop_thread);
        if shared.generation.load(Ordering::SeqCst) == generation {
            *slot = Some((generation, thread::current().id()));
        }
    }
    log::info!("Loop driver thread started.");

    let is_current = |shared: &DriverShared| {
        shared.running.load(Ordering::SeqCst)
            && shared.generation.load(Ordering::SeqCst) == generation
    };

    let mut last_time = started_at;
    'main: while is_current(&shared) {
        let now = clock.now_nanos();
        let delta = now.saturating_sub(last_time) as f64 / NANOS_PER_SECOND;
        last_time = now;

        let (step, tick_delta) = {
            let mut timer = lock(&shared.timer);
            let step = timer.advance(delta);
            (step, timer.tick_duration())
        };

        let Some(target) = target.upgrade() else {
            log::debug!("Loop target dropped; leaving loop.");
            break;
        };

        if step.dropped_ticks > 0 {
            log::warn!(
                "Loop fell behind; dropped {} ticks of catch-up.",
                step.dropped_ticks
            );
        }

        if !shared.paused.load(Ordering::SeqCst) {
            for _ in 0..step.ticks {
                if let Err(e) = target.tick(tick_delta) {
                    log::error!("Tick failed, stopping loop: {e:#}");
                    stop_generation(&shared, generation);
                    break 'main;
                }
            }
        }

        if step.render {
            if let Err(e) = target.render() {
                log::error!("Render failed, stopping loop: {e:#}");
                stop_generation(&shared, generation);
                break;
            }
        }

        if let Some(fps) = step.fps {
            shared.fps.store(fps, Ordering::Relaxed);
            log::trace!("Measured {fps} fps.");
            if let Some(listener) = lock(&shared.fps_listener).as_mut() {
                listener(fps);
            }
        }

        drop(target);
        if step.ticks == 0 && !step.render {
            thread::sleep(idle_sleep);
        }
    }

    // A restart may already have claimed the slot for a newer thread.
    {
        let mut slot = lock(&shared.loop_thread);
        if slot.is_some_and(|(owner, _)| owner == generation) {
            *slot = None;
        }
    }
    log::info!("Loop driver thread stopped.");
}

fn stop_generation(shared: &DriverShared, generation: u64) {
    if shared.generation.load(Ordering::SeqCst) == generation {
        shared.running.store(false, Ordering::SeqCst);
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
