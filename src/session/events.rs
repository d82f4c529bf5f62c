use std::sync::Mutex;

use serde::Serialize;

use crate::scan::ScanView;

use super::{
    engine::{all_locked, RevealSignal, SessionSnapshot},
    state::SessionState,
};

/// Outbound messages for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum EngineEvent {
    StateChanged(SessionState),
    Progress(SessionSnapshot),
    Scan(ScanView),
    LogLine(String),
    Reveal(RevealSignal),
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, matches: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|event| matches(event)).count())
            .unwrap_or(0)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Human-readable stdout presenter.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged(state) => {
                println!("== {} ({})", state.as_str(), state.mode());
            }
            EngineEvent::Progress(snapshot) => {
                let fields: Vec<String> = snapshot
                    .fields
                    .iter()
                    .map(|view| {
                        let status = view.status.label();
                        format!("{}: {} [{status}]", view.field.label(), view.text)
                    })
                    .collect();
                let lock = if all_locked(&snapshot.fields) { " *" } else { "" };
                println!(
                    "{} {:>3}% {:<8} | {} | scan {}{lock}",
                    snapshot.countdown,
                    snapshot.progress_pct,
                    snapshot.integrity,
                    fields.join(" | "),
                    snapshot.scan.label,
                );
            }
            EngineEvent::Scan(_) => {}
            EngineEvent::LogLine(line) => println!("{line}"),
            EngineEvent::Reveal(reveal) => {
                println!(">> FINAL SCREEN [{}]", reveal.final_image);
                println!("   {} {}", reveal.seed.first_name, reveal.seed.last_name);
                println!("   {}", reveal.seed.email);
                println!("   {} ({})", reveal.seed.phone, reveal.seed.country);
            }
        }
    }
}

/// One JSON object per line on stdout.
#[derive(Debug, Default)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: EngineEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => log::warn!("failed to serialize event: {err}"),
        }
    }
}
