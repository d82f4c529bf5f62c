use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    clock::{format_countdown, Clock},
    oplog::OpsLog,
    rain::{GridSurface, RainRenderer},
    reveal::{flavor::maybe_flavor, render_field, Field, FieldStatus, FieldView, RevealStyle},
    scan::{ImageHandle, ScanCycler, ScanView},
    seed::{generate_seed, LeadSeed, SeedInput},
    settings::EngineConfig,
};

use super::state::{integrity_label, SessionRecord, SessionState};

// Set to true to log every coarse tick
const ENABLE_LOGS: bool = false;

use crate::log_debug;

const REPORT_HEADER: &str = ">> MATRIX LEAD ASSEMBLER";

/// Terminal screen payload, produced once per session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevealSignal {
    pub session_id: String,
    pub final_image: ImageHandle,
    pub seed: LeadSeed,
}

/// Result of one coarse tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// False when the session was not running and the tick did nothing.
    pub ran: bool,
    pub scan_opened: bool,
    /// This tick crossed the duration boundary and completed the session.
    pub completed: bool,
}

/// Display state handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub status: String,
    pub mode: String,
    pub session_id: Option<String>,
    pub countdown: String,
    pub progress_pct: u8,
    pub integrity: String,
    pub fields: Vec<FieldView>,
    pub scan: ScanView,
    pub output: String,
    pub reveal: Option<RevealSignal>,
}

/// The session state machine. Synchronous and clock-injected: periodic tasks
/// call into it, it never schedules anything itself.
pub struct SessionEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
    state: SessionState,
    session: Option<SessionRecord>,
    fields: Vec<FieldView>,
    scan: ScanCycler,
    rain: RainRenderer,
    surface: GridSurface,
    log: OpsLog,
    ticks: u64,
    progress_pct: u8,
    countdown: String,
    integrity: &'static str,
    output: String,
    reveal: Option<RevealSignal>,
    completions: u32,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        mut rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let rain = RainRenderer::new(
            config.rain.clone(),
            config.viewport_width,
            config.viewport_height,
            rng.as_mut(),
        );
        let surface = GridSurface::new(config.viewport_width, config.viewport_height, rain.cell());
        let scan = ScanCycler::new(
            config.scan_pool.clone(),
            config.final_image.clone(),
            config.placeholder_image.clone(),
            config.resolver(),
        );

        Self {
            countdown: format_countdown(config.duration_ms),
            config,
            clock,
            rng,
            state: SessionState::Idle,
            session: None,
            fields: waiting_fields(),
            scan,
            rain,
            surface,
            log: OpsLog::new(),
            ticks: 0,
            progress_pct: 0,
            integrity: "unknown",
            output: "ready.".into(),
            reveal: None,
            completions: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn seed(&self) -> Option<&LeadSeed> {
        self.session.as_ref().map(|session| &session.seed)
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    pub fn log(&self) -> &OpsLog {
        &self.log
    }

    pub fn fields(&self) -> &[FieldView] {
        &self.fields
    }

    pub fn scan(&self) -> &ScanCycler {
        &self.scan
    }

    pub fn surface(&self) -> &GridSurface {
        &self.surface
    }

    pub fn reveal(&self) -> Option<&RevealSignal> {
        self.reveal.as_ref()
    }

    /// Times the Running → Complete transition has fired since construction.
    pub fn completions(&self) -> u32 {
        self.completions
    }

    /// Idle → Arming: mints the seed and session identity. Ignored otherwise.
    pub fn arm(&mut self, input: &SeedInput) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }

        // Disk probes happen here, once, rather than on the periodic ticks.
        self.scan.preload_assets();
        let seed = generate_seed(input, self.rng.as_mut());
        let lead_id = format!("LD-{}-{}", self.hex(4), self.hex(4)).to_uppercase();
        let session_id = Uuid::new_v4().to_string();

        self.log.push("boot: matrix_rain::init()");
        self.log.push("boot: lead_assembler::start()");
        self.log.push(format!(
            "seed: name=\"{}\", surname=\"{}\", email=\"{}\", phone=\"{}\", country=\"{}\"",
            seed.first_name, seed.last_name, seed.email, seed.phone, seed.country
        ));

        log::info!("session {session_id} armed");
        self.session = Some(SessionRecord::new(session_id, lead_id, seed));
        self.state = SessionState::Arming;
        self.integrity = "checking...";
        self.fields = waiting_fields();
        true
    }

    /// Arming → Running: captures the start instant and runs the first tick.
    pub fn launch(&mut self) -> Option<TickOutcome> {
        if self.state != SessionState::Arming {
            return None;
        }
        let now = self.clock.now_ms();
        let duration_ms = self.config.duration_ms;
        if let Some(session) = self.session.as_mut() {
            session.begin(now, duration_ms);
        }
        self.state = SessionState::Running;
        Some(self.tick())
    }

    /// `arm` followed by `launch`.
    pub fn start(&mut self, input: &SeedInput) -> Option<TickOutcome> {
        if !self.arm(input) {
            return None;
        }
        self.launch()
    }

    /// Coarse tick: progress, fields, scan window, then the end check, in that
    /// order, so the completing tick locks every field before finishing.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::default();
        }
        let Some(clock) = self.session.as_ref().and_then(|session| session.clock) else {
            return TickOutcome::default();
        };

        let now = self.clock.now_ms();
        let elapsed = clock.elapsed_ms(now);
        let t = clock.progress(now);
        self.ticks += 1;

        self.countdown = format_countdown(clock.remaining_ms(now));
        self.progress_pct = (t * 100.0).floor() as u8;
        self.integrity = integrity_label(self.progress_pct);
        self.update_fields(t);

        if let Some(line) = maybe_flavor(self.config.flavor_chance, self.rng.as_mut()) {
            self.log.push(line);
        }
        self.output = self.assembling_report();

        let mut outcome = TickOutcome {
            ran: true,
            ..TickOutcome::default()
        };
        let scan_open = self.config.scan_activation.is_open(elapsed, clock.duration_ms);
        if scan_open && !self.scan.is_active() {
            outcome.scan_opened = self.scan.activate();
        }

        log_debug!("tick {} at {elapsed}ms ({}%)", self.ticks, self.progress_pct);

        if clock.is_exhausted(now) {
            outcome.completed = self.finish();
        }
        outcome
    }

    /// Fast scan tick. No-op unless running with the scan open.
    pub fn scan_tick(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.scan.advance(self.rng.as_mut())
    }

    /// Session redraw at decaying intensity. No-op unless running.
    pub fn render_session_frame(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        let t = self
            .session
            .as_ref()
            .and_then(|session| session.clock)
            .map(|clock| clock.progress(self.clock.now_ms()))
            .unwrap_or(0.0);
        let intensity = self.config.running_intensity(t);
        self.rain.draw(&mut self.surface, intensity, self.rng.as_mut());
        true
    }

    /// Idle decoration. Draws whenever no session is running.
    pub fn render_idle_frame(&mut self) -> bool {
        if self.state == SessionState::Running {
            return false;
        }
        let intensity = self.config.idle_intensity;
        self.rain.draw(&mut self.surface, intensity, self.rng.as_mut());
        true
    }

    /// Viewport change: regrids the rain and starts a blank surface. Allowed in
    /// any state; the session itself is untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self.rain.resize(width, height, self.rng.as_mut());
        self.surface = GridSurface::new(width, height, self.rain.cell());
        log::info!("viewport resized to {width}x{height}, cell {}", self.rain.cell());
    }

    /// Running → Complete, observable exactly once. Later calls are no-ops.
    pub fn finish(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.state = SessionState::Complete;
        self.completions += 1;

        let Some(session) = self.session.as_ref() else {
            return true;
        };
        let seed = session.seed.clone();
        let session_id = session.session_id.clone();

        self.fields = Field::ALL
            .iter()
            .map(|field| FieldView::locked(*field, field.value(&seed)))
            .collect();
        self.progress_pct = 100;
        self.countdown = format_countdown(0);
        self.integrity = "done";

        self.rain.draw(&mut self.surface, 1.0, self.rng.as_mut());
        let scan_was_active = self.scan.lock();

        self.log.push("assembler: finalize()");
        self.log.push("matrix: render_final_payload()");
        if scan_was_active {
            self.log.push("scan: lock_result()");
        }
        self.output = final_report(&seed);

        let final_image = self.scan.displayable(self.scan.final_handle());
        self.reveal = Some(RevealSignal {
            session_id: session_id.clone(),
            final_image,
            seed,
        });

        log::info!("session {session_id} complete");
        true
    }

    /// Maps a user close onto `finish`; no-op unless running.
    pub fn request_early_close(&mut self) -> bool {
        self.finish()
    }

    /// Back to Idle from any state, discarding the seed and display buffers.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("session {} reset from {:?}", session.session_id, self.state);
        }
        self.state = SessionState::Idle;
        self.fields = waiting_fields();
        self.scan.reset();
        self.log.clear();
        self.surface = GridSurface::new(
            self.config.viewport_width,
            self.config.viewport_height,
            self.rain.cell(),
        );
        self.ticks = 0;
        self.progress_pct = 0;
        self.countdown = format_countdown(self.config.duration_ms);
        self.integrity = "unknown";
        self.output = "ready.".into();
        self.reveal = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            status: self.state.as_str().to_string(),
            mode: self.state.mode().to_string(),
            session_id: self.session.as_ref().map(|s| s.session_id.clone()),
            countdown: self.countdown.clone(),
            progress_pct: self.progress_pct,
            integrity: self.integrity.to_string(),
            fields: self.fields.clone(),
            scan: self.scan.view(),
            output: self.output.clone(),
            reveal: self.reveal.clone(),
        }
    }

    fn update_fields(&mut self, t: f64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let style = RevealStyle {
            policy: self.config.reveal_policy,
            glyphs: self.rain.glyphs(),
            frame: self.ticks,
        };
        let rng = self.rng.as_mut();

        let mut fields = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let window = self.config.windows.get(field);
            fields.push(render_field(
                field,
                field.value(&session.seed),
                window,
                t,
                style,
                &mut *rng,
            ));
        }
        self.fields = fields;
    }

    fn assembling_report(&mut self) -> String {
        let Some(session) = self.session.as_ref() else {
            return "ready.".into();
        };
        let pct = f64::from(self.progress_pct) / 100.0;
        let noise: f64 = self.rng.gen();
        let signal = ((pct * 0.82 + noise * 0.18).clamp(0.0, 1.0) * 1000.0).round() / 10.0;
        let entropy = ((1.0 - pct) * 1000.0).round() / 10.0;

        let mut lines = vec![
            REPORT_HEADER.to_string(),
            format!("session_id: {}", session.session_id),
            format!("lead_id: {}", session.lead_id),
            format!("progress: {}%", self.progress_pct),
        ];
        for view in &self.fields {
            lines.push(format!("candidate.{}: {}", view.field.label(), view.text));
        }
        lines.push(format!("candidate.country: {}", session.seed.country));
        lines.push(format!("signal_strength: {signal}"));
        lines.push(format!("entropy: {entropy}"));
        lines.push("status: assembling...".into());
        lines.join("\n")
    }

    fn hex(&mut self, len: usize) -> String {
        const HEX: &[u8] = b"abcdef0123456789";
        (0..len)
            .map(|_| char::from(HEX[self.rng.gen_range(0..HEX.len())]))
            .collect()
    }
}

fn waiting_fields() -> Vec<FieldView> {
    Field::ALL.iter().map(|field| FieldView::waiting(*field)).collect()
}

fn final_report(seed: &LeadSeed) -> String {
    [
        REPORT_HEADER.to_string(),
        "status: COMPLETE".into(),
        "result: lead_generated=true".into(),
        format!("name: {}", seed.first_name),
        format!("surname: {}", seed.last_name),
        format!("email: {}", seed.email),
        format!("phone: {}", seed.phone),
        format!("country: {}", seed.country),
        String::new(),
        ">> SHOWING FINAL SCREEN...".into(),
    ]
    .join("\n")
}

/// True once every field shows its locked value.
pub fn all_locked(fields: &[FieldView]) -> bool {
    fields.iter().all(|view| view.status == FieldStatus::Locked)
}
