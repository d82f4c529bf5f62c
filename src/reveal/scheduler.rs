use rand::{Rng, RngCore};
use serde::Serialize;

use super::config::{Field, PhaseWindow, RevealPolicy};

/// Shown for fields whose window has not opened yet.
pub const PLACEHOLDER: &str = "—";

const CURSOR: char = '▌';

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FieldStatus {
    Waiting,
    Assembling,
    Locked,
}

impl FieldStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FieldStatus::Waiting => "waiting",
            FieldStatus::Assembling => "assembling",
            FieldStatus::Locked => "locked",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub field: Field,
    pub text: String,
    pub status: FieldStatus,
    pub progress: f64,
}

impl FieldView {
    pub fn waiting(field: Field) -> Self {
        Self {
            field,
            text: PLACEHOLDER.to_string(),
            status: FieldStatus::Waiting,
            progress: 0.0,
        }
    }

    pub fn locked(field: Field, value: &str) -> Self {
        Self {
            field,
            text: value.to_string(),
            status: FieldStatus::Locked,
            progress: 1.0,
        }
    }
}

/// How assembling fields look on a given tick. `frame` drives the prefix
/// cursor blink; `glyphs` feeds the scramble.
#[derive(Debug, Clone, Copy)]
pub struct RevealStyle<'a> {
    pub policy: RevealPolicy,
    pub glyphs: &'a [char],
    pub frame: u64,
}

/// Renders one field at global progress `t`.
pub fn render_field(
    field: Field,
    value: &str,
    window: PhaseWindow,
    t: f64,
    style: RevealStyle<'_>,
    rng: &mut dyn RngCore,
) -> FieldView {
    let RevealStyle {
        policy,
        glyphs,
        frame,
    } = style;
    if t < window.start {
        return FieldView::waiting(field);
    }

    let local = window.local_progress(t);
    if local >= 1.0 {
        return FieldView::locked(field, value);
    }

    let chars: Vec<char> = value.chars().collect();
    let revealed = ((local * chars.len() as f64).floor() as usize).min(chars.len());

    let text = match policy {
        RevealPolicy::Prefix => {
            let mut text: String = chars[..revealed].iter().collect();
            text.push(if frame % 2 == 0 { CURSOR } else { ' ' });
            text
        }
        RevealPolicy::Scramble => chars
            .iter()
            .enumerate()
            .map(|(idx, ch)| {
                if idx < revealed || ch.is_whitespace() || glyphs.is_empty() {
                    *ch
                } else {
                    glyphs[rng.gen_range(0..glyphs.len())]
                }
            })
            .collect(),
    };

    FieldView {
        field,
        text,
        status: FieldStatus::Assembling,
        progress: local,
    }
}
