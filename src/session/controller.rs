use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use log::info;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{scan::ScanView, seed::SeedInput};

use super::{
    engine::{SessionEngine, SessionSnapshot},
    events::{EngineEvent, EventSink},
    state::SessionState,
};

// Set to true to trace task lifecycle
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Handles of the per-session periodic tasks. The idle rain loop is not here:
/// finishing a session never stops it.
#[derive(Default)]
struct SessionTasks {
    redraw: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    scan: Option<JoinHandle<()>>,
}

impl SessionTasks {
    fn active(&self) -> usize {
        [&self.redraw, &self.ticker, &self.scan]
            .iter()
            .filter(|handle| handle.is_some())
            .count()
    }

    fn abort_all(&mut self) -> usize {
        let mut aborted = 0;
        for handle in [self.redraw.take(), self.ticker.take(), self.scan.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
            aborted += 1;
        }
        aborted
    }
}

/// Drives a `SessionEngine` from tokio intervals. Only the controller cancels
/// tasks; each task re-checks the session state on every invocation and does
/// nothing unless it should.
#[derive(Clone)]
pub struct SessionController {
    engine: Arc<Mutex<SessionEngine>>,
    tasks: Arc<StdMutex<SessionTasks>>,
    idle_loop: Arc<StdMutex<Option<JoinHandle<()>>>>,
    sink: Arc<dyn EventSink>,
    state_tx: Arc<watch::Sender<SessionState>>,
    log_seen: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    frame_interval: Duration,
    tick_interval: Duration,
    scan_interval: Duration,
}

impl SessionController {
    pub fn new(engine: SessionEngine, sink: Arc<dyn EventSink>) -> Self {
        let config = engine.config();
        let frame_interval = config.frame_interval();
        let tick_interval = config.tick_interval();
        let scan_interval = config.scan_interval();
        let (state_tx, _) = watch::channel(engine.state());

        Self {
            engine: Arc::new(Mutex::new(engine)),
            tasks: Arc::new(StdMutex::new(SessionTasks::default())),
            idle_loop: Arc::new(StdMutex::new(None)),
            sink,
            state_tx: Arc::new(state_tx),
            log_seen: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
            frame_interval,
            tick_interval,
            scan_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.engine.lock().await.state()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.engine.lock().await.snapshot()
    }

    /// Viewport change from the presentation layer.
    pub async fn resize(&self, width: u32, height: u32) {
        self.engine.lock().await.resize(width, height);
    }

    pub async fn frame_text(&self) -> String {
        self.engine.lock().await.surface().to_text()
    }

    /// Runs `f` against the engine under the lock.
    pub async fn inspect<T>(&self, f: impl FnOnce(&SessionEngine) -> T) -> T {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    /// Number of per-session tasks currently held.
    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.active()).unwrap_or(0)
    }

    /// Starts the always-on background rain. Runs until `shutdown`.
    pub fn spawn_idle_loop(&self) {
        let Ok(mut guard) = self.idle_loop.lock() else {
            return;
        };
        if guard.is_some() {
            return;
        }

        let engine = self.engine.clone();
        let token = self.shutdown.clone();
        let frame_interval = self.frame_interval;

        *guard = Some(tokio::spawn(async move {
            let mut ticker = time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.lock().await.render_idle_frame();
                    }
                    _ = token.cancelled() => {
                        log_info!("idle rain loop shutting down");
                        break;
                    }
                }
            }
        }));
    }

    /// Idle → Arming → Running. Returns `None` when a session is already
    /// underway or complete.
    pub async fn start(&self, input: SeedInput) -> Option<SessionSnapshot> {
        let mut engine = self.engine.lock().await;
        if !engine.arm(&input) {
            log_info!("start ignored while {:?}", engine.state());
            return None;
        }
        self.publish_state(SessionState::Arming);
        self.flush_log(&engine);

        let outcome = engine.launch()?;
        self.publish_state(SessionState::Running);
        self.flush_log(&engine);
        let snapshot = engine.snapshot();
        self.sink.emit(EngineEvent::Progress(snapshot.clone()));

        self.spawn_session_tasks();
        if outcome.scan_opened {
            self.ensure_scan_task();
        }
        Some(snapshot)
    }

    /// Completes a running session. Safe to call from any task, any number of
    /// times; only the first call while running has effects.
    pub async fn finish(&self) -> bool {
        let mut engine = self.engine.lock().await;
        if !engine.finish() {
            return false;
        }
        self.after_finish(&engine);
        drop(engine);
        self.cancel_session_tasks();
        true
    }

    /// User-driven close. Maps to `finish` while running, otherwise a no-op.
    pub async fn request_early_close(&self) -> bool {
        self.finish().await
    }

    /// Back to Idle from anywhere. Always cancels session tasks.
    pub async fn reset(&self) -> SessionSnapshot {
        // Task spawns happen under the engine lock, so nothing can register
        // a handle between this cancel and the reset.
        let mut engine = self.engine.lock().await;
        let aborted = self.cancel_session_tasks();
        engine.reset();
        self.log_seen.store(0, Ordering::SeqCst);
        self.publish_state(SessionState::Idle);
        log_info!("reset cancelled {aborted} session task(s)");
        engine.snapshot()
    }

    /// Stops everything, including the idle rain.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        self.cancel_session_tasks();

        let handle = self.idle_loop.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            handle.await.context("idle rain loop failed to join")?;
        }
        info!("session controller shut down");
        Ok(())
    }

    fn spawn_session_tasks(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            log_warn!("task registry poisoned; session runs without periodic tasks");
            return;
        };
        tasks.abort_all();

        let engine = self.engine.clone();
        let frame_interval = self.frame_interval;
        tasks.redraw = Some(tokio::spawn(async move {
            let mut ticker = time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                engine.lock().await.render_session_frame();
            }
        }));

        let controller = self.clone();
        let tick_interval = self.tick_interval;
        tasks.ticker = Some(tokio::spawn(async move {
            let mut ticker = time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; launch already ticked.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                controller.on_tick().await;
            }
        }));
    }

    /// Spawns the fast scan task unless one already exists.
    fn ensure_scan_task(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if tasks.scan.is_some() {
            return;
        }

        let engine = self.engine.clone();
        let sink = self.sink.clone();
        let scan_interval = self.scan_interval;
        tasks.scan = Some(tokio::spawn(async move {
            let mut ticker = time::interval(scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let view: Option<ScanView> = {
                    let mut engine = engine.lock().await;
                    engine.scan_tick().then(|| engine.scan().view())
                };
                if let Some(view) = view {
                    sink.emit(EngineEvent::Scan(view));
                }
            }
        }));
        log_info!("scan task spawned");
    }

    async fn on_tick(&self) {
        let mut engine = self.engine.lock().await;
        let outcome = engine.tick();
        if !outcome.ran {
            return;
        }

        self.sink.emit(EngineEvent::Progress(engine.snapshot()));
        self.flush_log(&engine);

        if outcome.completed {
            self.after_finish(&engine);
            drop(engine);
            // Aborts this very task too; nothing below may await.
            self.cancel_session_tasks();
            return;
        }

        if outcome.scan_opened {
            self.ensure_scan_task();
        }
    }

    fn after_finish(&self, engine: &SessionEngine) {
        self.publish_state(SessionState::Complete);
        self.flush_log(engine);
        self.sink.emit(EngineEvent::Progress(engine.snapshot()));
        if let Some(reveal) = engine.reveal() {
            self.sink.emit(EngineEvent::Reveal(reveal.clone()));
        }
    }

    fn cancel_session_tasks(&self) -> usize {
        self.tasks
            .lock()
            .map(|mut tasks| tasks.abort_all())
            .unwrap_or(0)
    }

    fn publish_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
        self.sink.emit(EngineEvent::StateChanged(state));
    }

    fn flush_log(&self, engine: &SessionEngine) {
        let seen = self.log_seen.load(Ordering::SeqCst);
        let fresh = engine.log().since(seen);
        for line in fresh {
            self.sink.emit(EngineEvent::LogLine(line.clone()));
        }
        self.log_seen.store(seen + fresh.len(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::SystemClock,
        reveal::FieldStatus,
        scan::{ScanActivation, ScanStage},
        session::events::RecordingSink,
        settings::EngineConfig,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn controller(config: EngineConfig) -> (SessionController, Arc<RecordingSink>) {
        let engine = SessionEngine::new(
            config,
            Arc::new(SystemClock::new()),
            Box::new(StdRng::seed_from_u64(8)),
        );
        let sink = Arc::new(RecordingSink::new());
        (SessionController::new(engine, sink.clone()), sink)
    }

    fn config() -> EngineConfig {
        EngineConfig {
            duration_ms: 1000,
            tick_interval_ms: 100,
            scan_interval_ms: 55,
            viewport_width: 320,
            viewport_height: 160,
            scan_activation: ScanActivation::LastMs(400),
            ..EngineConfig::default()
        }
    }

    fn reveals(sink: &RecordingSink) -> usize {
        sink.count(|event| matches!(event, EngineEvent::Reveal(_)))
    }

    #[tokio::test(start_paused = true)]
    async fn reset_with_open_scan_leaves_no_live_tasks() {
        let (controller, sink) = controller(EngineConfig {
            scan_activation: ScanActivation::FromStart,
            ..config()
        });
        controller.start(SeedInput::default()).await;
        assert_eq!(controller.active_tasks(), 3);

        time::sleep(Duration::from_millis(120)).await;
        controller.reset().await;
        assert_eq!(controller.active_tasks(), 0);

        let scans = sink.count(|event| matches!(event, EngineEvent::Scan(_)));
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(controller.active_tasks(), 0);
        assert_eq!(sink.count(|event| matches!(event, EngineEvent::Scan(_))), scans);
        assert_eq!(controller.state().await, SessionState::Idle);
        assert_eq!(reveals(&sink), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_runs_to_completion_exactly_once() {
        let (controller, sink) = controller(config());
        controller.spawn_idle_loop();
        let mut states = controller.subscribe();

        assert!(controller.start(SeedInput::new("Ann", "Lee")).await.is_some());
        assert_eq!(controller.active_tasks(), 2);

        time::sleep(Duration::from_millis(700)).await;
        assert_eq!(controller.active_tasks(), 3, "scan task spawned lazily");

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*states.borrow_and_update(), SessionState::Complete);
        assert_eq!(controller.active_tasks(), 0);
        assert_eq!(reveals(&sink), 1);

        let snapshot = controller.snapshot().await;
        assert!(snapshot.fields.iter().all(|f| f.status == FieldStatus::Locked));
        assert_eq!(snapshot.fields[0].text, "Ann");
        assert_eq!(snapshot.scan.stage, ScanStage::Locked);

        assert!(!controller.request_early_close().await);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(reveals(&sink), 1);
        assert_eq!(controller.inspect(|engine| engine.completions()).await, 1);

        controller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn early_close_and_timer_race_completes_once() {
        let (controller, sink) = controller(config());
        controller.start(SeedInput::default()).await;
        time::sleep(Duration::from_millis(950)).await;

        let closer = controller.clone();
        let (a, b) = tokio::join!(closer.request_early_close(), async {
            time::sleep(Duration::from_millis(100)).await;
            controller.finish().await
        });
        assert!(a);
        assert!(!b);
        assert_eq!(reveals(&sink), 1);
        assert_eq!(
            sink.count(|event| matches!(event, EngineEvent::StateChanged(SessionState::Complete))),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scan_cycles_during_its_window() {
        let mut cfg = config();
        cfg.duration_ms = 5000;
        cfg.scan_activation = ScanActivation::FromStart;
        let (controller, sink) = controller(cfg);
        controller.start(SeedInput::default()).await;
        assert_eq!(controller.active_tasks(), 3);

        time::sleep(Duration::from_millis(600)).await;
        let advances = controller.inspect(|engine| engine.scan().advances()).await;
        assert!(advances > 6, "only {advances} advances");

        let pool = controller.inspect(|engine| engine.config().scan_pool.clone()).await;
        for event in sink.events() {
            if let EngineEvent::Scan(view) = event {
                assert!(pool.contains(view.shown.as_ref().unwrap()));
            }
        }

        controller.request_early_close().await;
        let view = controller.snapshot().await.scan;
        assert_eq!(view.shown, Some(controller.inspect(|e| e.config().final_image.clone()).await));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_tasks_and_allows_fresh_start() {
        let (controller, sink) = controller(config());
        controller.spawn_idle_loop();
        controller.start(SeedInput::default()).await;
        let first = controller.inspect(|engine| engine.seed().cloned()).await.unwrap();
        time::sleep(Duration::from_millis(300)).await;

        let snapshot = controller.reset().await;
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(controller.active_tasks(), 0);
        assert!(controller.inspect(|engine| engine.log().is_empty()).await);

        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(controller.state().await, SessionState::Idle);
        assert_eq!(reveals(&sink), 0);

        assert!(controller.start(SeedInput::default()).await.is_some());
        let second = controller.inspect(|engine| engine.seed().cloned()).await.unwrap();
        assert_ne!(first, second);

        time::sleep(Duration::from_millis(50)).await;
        assert!(!controller.frame_text().await.trim().is_empty());

        controller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_ignored() {
        let (controller, sink) = controller(config());
        controller.start(SeedInput::default()).await;
        assert!(controller.start(SeedInput::default()).await.is_none());
        assert_eq!(
            sink.count(|event| matches!(event, EngineEvent::StateChanged(SessionState::Arming))),
            1
        );
        assert_eq!(controller.active_tasks(), 2);
    }
}
