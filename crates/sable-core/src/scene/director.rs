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

use super::{SceneFactory, SceneInstance, SceneRegistry, SharedScene};
use crate::container::ContainerHandle;
use crate::error::EngineError;
use crate::platform::Viewport;
use crate::resource::ProducerDedup;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

struct LoadJob {
    scene: SharedScene,
    generation: u64,
}

enum LoadOutcome {
    Ready {
        scene: SharedScene,
        generation: u64,
    },
    Failed {
        scene: SharedScene,
        generation: u64,
        error: EngineError,
    },
}

/// The background thread main scenes are loaded on. Jobs run one at a time,
/// in submission order.
struct LoaderWorker {
    jobs: Sender<LoadJob>,
    handle: JoinHandle<()>,
}

impl LoaderWorker {
    fn spawn(latest: Arc<AtomicU64>, results: Sender<LoadOutcome>) -> std::io::Result<Self> {
        let (jobs, queue) = crossbeam_channel::unbounded::<LoadJob>();
        let handle = thread::Builder::new()
            .name("sable-scene-loader".to_string())
            .spawn(move || {
                log::debug!("Scene loader thread started.");
                for job in queue.iter() {
                    if job.generation != latest.load(Ordering::SeqCst) {
                        log::debug!("Skipping superseded scene load.");
                        lock(&job.scene).kill();
                        continue;
                    }
                    let result = lock(&job.scene).load();
                    let outcome = match result {
                        Ok(()) => LoadOutcome::Ready {
                            scene: job.scene,
                            generation: job.generation,
                        },
                        Err(error) => LoadOutcome::Failed {
                            scene: job.scene,
                            generation: job.generation,
                            error,
                        },
                    };
                    if results.send(outcome).is_err() {
                        break;
                    }
                }
                log::debug!("Scene loader thread stopped.");
            })?;
        Ok(Self { jobs, handle })
    }
}

/// Owns the scene registry and the current scene, and carries out transitions.
///
/// Every method that changes the current scene is meant to be called from the
/// loop thread between two render passes:
/// * [`perform_pending`](Self::perform_pending) starts a requested transition.
/// * [`poll_loaded`](Self::poll_loaded) installs a main scene once it has loaded.
///
/// A request made while a previous load is still in flight supersedes it: the
/// earlier scene is killed when its load ends and never becomes current.
pub struct SceneDirector {
    registry: RwLock<SceneRegistry>,
    dedup: ProducerDedup,
    current: Mutex<Option<SharedScene>>,
    pending: Mutex<Option<String>>,
    generation: Arc<AtomicU64>,
    awaiting: AtomicU64,
    worker: Mutex<Option<LoaderWorker>>,
    results_tx: Sender<LoadOutcome>,
    results: Receiver<LoadOutcome>,
}

impl SceneDirector {
    /// Creates a director with an empty registry.
    pub fn new(dedup: ProducerDedup) -> Self {
        let (results_tx, results) = crossbeam_channel::unbounded();
        Self {
            registry: RwLock::new(SceneRegistry::new()),
            dedup,
            current: Mutex::new(None),
            pending: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            awaiting: AtomicU64::new(0),
            worker: Mutex::new(None),
            results_tx,
            results,
        }
    }

    /// Registers a scene and its optional loading scene.
    pub fn add_scene(
        &self,
        name: &str,
        main: SceneFactory,
        loading: Option<SceneFactory>,
    ) -> Result<(), EngineError> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(name, main, loading)
    }

    /// Whether a scene is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Records a transition to run at the next safe point.
    ///
    /// Unknown names fail right away. A later request replaces an earlier one
    /// that has not run yet.
    pub fn request_scene(&self, name: &str) -> Result<(), EngineError> {
        if !self.is_registered(name) {
            return Err(EngineError::SceneNotRegistered(name.to_string()));
        }
        let previous = lock(&self.pending).replace(name.to_string());
        if let Some(previous) = previous {
            log::debug!("Scene request '{name}' supersedes pending '{previous}'.");
        }
        Ok(())
    }

    /// Whether a requested transition has not started yet.
    pub fn has_pending_transition(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Whether a main scene is loading in the background.
    pub fn is_loading(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst) != 0
    }

    /// The current scene, which may be a loading scene.
    pub fn current(&self) -> Option<SharedScene> {
        lock(&self.current).clone()
    }

    /// Name of the current scene.
    pub fn current_name(&self) -> Option<String> {
        let current = self.current()?;
        let name = lock(&current).name().to_string();
        Some(name)
    }

    /// Starts the pending transition, if any. Returns whether one was started.
    pub fn perform_pending(
        &self,
        container: &ContainerHandle,
        viewport: &Viewport,
    ) -> Result<bool, EngineError> {
        let Some(name) = lock(&self.pending).take() else {
            return Ok(false);
        };
        self.perform_transition(&name, container, viewport)?;
        Ok(true)
    }

    /// Kills the current scene, shows the loading scene if there is one, and
    /// queues the main scene's load on the loader thread.
    pub fn perform_transition(
        &self,
        name: &str,
        container: &ContainerHandle,
        viewport: &Viewport,
    ) -> Result<(), EngineError> {
        let entry = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Transitioning to scene '{}'.", entry.name());

        let old = lock(&self.current).take();
        if let Some(old) = old {
            lock(&old).kill();
        }

        if let Some(behaviour) = entry.build_loading() {
            let mut loading =
                SceneInstance::new(entry.name(), behaviour, self.dedup, container.clone());
            loading.load()?;
            loading.refresh(viewport);
            let loading = loading.into_shared();
            *lock(&self.current) = Some(Arc::clone(&loading));
            lock(&loading).start();
        }

        let main = SceneInstance::new(
            entry.name(),
            entry.build_main(),
            self.dedup,
            container.clone(),
        )
        .into_shared();
        self.awaiting.store(generation, Ordering::SeqCst);
        self.submit(LoadJob {
            scene: main,
            generation,
        })
    }

    fn submit(&self, job: LoadJob) -> Result<(), EngineError> {
        let mut worker = lock(&self.worker);
        if worker.is_none() {
            *worker = Some(LoaderWorker::spawn(
                Arc::clone(&self.generation),
                self.results_tx.clone(),
            )?);
        }
        let scene = Arc::clone(&job.scene);
        let sent = worker
            .as_ref()
            .is_some_and(|worker| worker.jobs.send(job).is_ok());
        if !sent {
            let name = lock(&scene).name().to_string();
            return Err(EngineError::SceneLoad {
                scene: name,
                source: anyhow::anyhow!("scene loader thread is gone"),
            });
        }
        Ok(())
    }

    /// Installs finished loads. A load that failed is returned as an error.
    pub fn poll_loaded(&self, viewport: &Viewport) -> Result<(), EngineError> {
        while let Ok(outcome) = self.results.try_recv() {
            match outcome {
                LoadOutcome::Ready { scene, generation } if self.is_latest(generation) => {
                    self.awaiting.store(0, Ordering::SeqCst);
                    self.install(scene, viewport);
                }
                LoadOutcome::Ready { scene, .. } => {
                    let mut stale = lock(&scene);
                    log::debug!("Discarding superseded scene '{}'.", stale.name());
                    stale.kill();
                }
                LoadOutcome::Failed {
                    scene,
                    generation,
                    error,
                } => {
                    lock(&scene).kill();
                    if self.is_latest(generation) {
                        self.awaiting.store(0, Ordering::SeqCst);
                        return Err(error);
                    }
                    log::warn!("Superseded scene load failed: {error}");
                }
            }
        }
        Ok(())
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Kills whatever is current, then makes `scene` current and starts it.
    fn install(&self, scene: SharedScene, viewport: &Viewport) {
        {
            let mut current = lock(&self.current);
            if let Some(old) = current.take() {
                if !Arc::ptr_eq(&old, &scene) {
                    lock(&old).kill();
                }
            }
            *current = Some(Arc::clone(&scene));
        }
        let mut instance = lock(&scene);
        instance.refresh(viewport);
        instance.start();
        log::info!("Scene '{}' is now current.", instance.name());
    }

    /// Forwards a viewport change to the current scene.
    pub fn refresh(&self, viewport: &Viewport) {
        if let Some(current) = self.current() {
            lock(&current).refresh(viewport);
        }
    }

    /// Cancels pending and in-flight transitions, stops the loader thread and
    /// kills the current scene. Waits for a load already running to finish,
    /// unless called from that load.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.awaiting.store(0, Ordering::SeqCst);
        lock(&self.pending).take();

        let worker = lock(&self.worker).take();
        if let Some(LoaderWorker { jobs, handle }) = worker {
            drop(jobs);
            // A scene may shut the container down from its own load.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                log::error!("Scene loader thread panicked.");
            }
        }

        let current = lock(&self.current).take();
        if let Some(current) = current {
            lock(&current).kill();
        }
        while let Ok(outcome) = self.results.try_recv() {
            match outcome {
                LoadOutcome::Ready { scene, .. } | LoadOutcome::Failed { scene, .. } => {
                    lock(&scene).kill();
                }
            }
        }
    }
}

impl Drop for SceneDirector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{LoadingIndicator, Scene, SceneContext, SceneState};
    use std::sync::atomic::AtomicU32;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Log {
        loads: AtomicU32,
        kills: AtomicU32,
    }

    struct Level {
        log: Arc<Log>,
        delay: Duration,
        fail: bool,
    }

    impl Scene for Level {
        fn load(&mut self, _context: &mut SceneContext<'_>) -> anyhow::Result<()> {
            thread::sleep(self.delay);
            self.log.loads.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.fail, "corrupt level");
            Ok(())
        }

        fn kill(&mut self) {
            self.log.kills.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn level(log: &Arc<Log>, delay: Duration, fail: bool) -> SceneFactory {
        let log = Arc::clone(log);
        Arc::new(move || {
            Box::new(Level {
                log: Arc::clone(&log),
                delay,
                fail,
            }) as Box<dyn Scene>
        })
    }

    fn loading() -> SceneFactory {
        Arc::new(|| Box::new(LoadingIndicator::new()) as Box<dyn Scene>)
    }

    fn viewport() -> Viewport {
        Viewport::new(320, 240, 16.0)
    }

    fn settle(director: &SceneDirector) -> Result<(), EngineError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while director.is_loading() && Instant::now() < deadline {
            director.poll_loaded(&viewport())?;
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn state_of(scene: &SharedScene) -> SceneState {
        lock(scene).state()
    }

    #[test]
    fn test_request_for_unknown_scene_fails_immediately() {
        let director = SceneDirector::new(ProducerDedup::PerType);
        assert!(matches!(
            director.request_scene("ghost"),
            Err(EngineError::SceneNotRegistered(_))
        ));
        assert!(!director.has_pending_transition());
    }

    #[test]
    fn test_request_is_deferred() {
        let log = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("a", level(&log, Duration::ZERO, false), None)
            .unwrap();

        director.request_scene("A").unwrap();
        assert!(director.has_pending_transition());
        assert!(director.current().is_none());
        assert_eq!(log.loads.load(Ordering::SeqCst), 0);

        assert!(director
            .perform_pending(&ContainerHandle::detached(), &viewport())
            .unwrap());
        settle(&director).unwrap();
        assert_eq!(director.current_name().as_deref(), Some("a"));
        let current = director.current().unwrap();
        assert_eq!(state_of(&current), SceneState::Active);
    }

    #[test]
    fn test_loading_scene_is_current_while_main_loads() {
        let log = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene(
                "b",
                level(&log, Duration::from_millis(100), false),
                Some(loading()),
            )
            .unwrap();

        director
            .perform_transition("b", &ContainerHandle::detached(), &viewport())
            .unwrap();
        let shown = director.current().unwrap();
        assert_eq!(state_of(&shown), SceneState::Active);
        assert!(director.is_loading());

        settle(&director).unwrap();
        let main = director.current().unwrap();
        assert!(!Arc::ptr_eq(&shown, &main));
        assert_eq!(state_of(&shown), SceneState::Dead);
        assert_eq!(state_of(&main), SceneState::Active);
    }

    #[test]
    fn test_old_scene_is_killed_once() {
        let first = Arc::new(Log::default());
        let second = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("a", level(&first, Duration::ZERO, false), None)
            .unwrap();
        director
            .add_scene("b", level(&second, Duration::ZERO, false), None)
            .unwrap();
        let handle = ContainerHandle::detached();

        director.perform_transition("a", &handle, &viewport()).unwrap();
        settle(&director).unwrap();
        director.perform_transition("b", &handle, &viewport()).unwrap();
        settle(&director).unwrap();

        assert_eq!(first.kills.load(Ordering::SeqCst), 1);
        assert_eq!(second.kills.load(Ordering::SeqCst), 0);
        assert_eq!(director.current_name().as_deref(), Some("b"));
    }

    #[test]
    fn test_newer_transition_supersedes_load_in_flight() {
        let slow = Arc::new(Log::default());
        let fast = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("slow", level(&slow, Duration::from_millis(100), false), None)
            .unwrap();
        director
            .add_scene("fast", level(&fast, Duration::ZERO, false), None)
            .unwrap();
        let handle = ContainerHandle::detached();

        director.perform_transition("slow", &handle, &viewport()).unwrap();
        director.perform_transition("fast", &handle, &viewport()).unwrap();
        settle(&director).unwrap();

        assert_eq!(director.current_name().as_deref(), Some("fast"));
        // The slow scene either loaded and was discarded, or was skipped.
        let deadline = Instant::now() + Duration::from_secs(5);
        while slow.kills.load(Ordering::SeqCst) == 0
            && slow.loads.load(Ordering::SeqCst) == 1
            && Instant::now() < deadline
        {
            director.poll_loaded(&viewport()).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(
            slow.kills.load(Ordering::SeqCst),
            slow.loads.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn test_later_request_wins() {
        let log = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("a", level(&log, Duration::ZERO, false), None)
            .unwrap();
        director
            .add_scene("b", level(&log, Duration::ZERO, false), None)
            .unwrap();

        director.request_scene("a").unwrap();
        director.request_scene("b").unwrap();
        director
            .perform_pending(&ContainerHandle::detached(), &viewport())
            .unwrap();
        settle(&director).unwrap();

        assert_eq!(director.current_name().as_deref(), Some("b"));
        assert_eq!(log.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_reported() {
        let log = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("broken", level(&log, Duration::ZERO, true), None)
            .unwrap();

        director
            .perform_transition("broken", &ContainerHandle::detached(), &viewport())
            .unwrap();
        let err = settle(&director).unwrap_err();
        assert!(matches!(err, EngineError::SceneLoad { ref scene, .. } if scene == "broken"));
        assert!(director.current().is_none());
        assert_eq!(log.kills.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_kills_current_scene() {
        let log = Arc::new(Log::default());
        let director = SceneDirector::new(ProducerDedup::PerType);
        director
            .add_scene("a", level(&log, Duration::ZERO, false), None)
            .unwrap();
        director
            .perform_transition("a", &ContainerHandle::detached(), &viewport())
            .unwrap();
        settle(&director).unwrap();

        director.shutdown();
        assert!(director.current().is_none());
        assert_eq!(log.kills.load(Ordering::SeqCst), 1);
    }
}
