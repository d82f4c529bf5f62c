use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::seed::LeadSeed;

/// The four revealed fields, in display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Surname,
    Email,
    Phone,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Surname, Field::Email, Field::Phone];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Surname => "surname",
            Field::Email => "email",
            Field::Phone => "phone",
        }
    }

    pub fn value<'a>(&self, seed: &'a LeadSeed) -> &'a str {
        match self {
            Field::Name => &seed.first_name,
            Field::Surname => &seed.last_name,
            Field::Email => &seed.email,
            Field::Phone => &seed.phone,
        }
    }
}

/// Sub-range of global progress during which one field assembles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhaseWindow {
    pub start: f64,
    pub end: f64,
}

impl PhaseWindow {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.start) || !(0.0..=1.0).contains(&self.end) {
            bail!("phase window [{}, {}] must lie within [0, 1]", self.start, self.end);
        }
        if self.start >= self.end {
            bail!("phase window start {} must precede end {}", self.start, self.end);
        }
        Ok(())
    }

    /// `clamp((t - start) / (end - start), 0, 1)`.
    pub fn local_progress(&self, t: f64) -> f64 {
        ((t - self.start) / (self.end - self.start)).clamp(0.0, 1.0)
    }
}

/// One window per field. Windows may overlap; that staggers the assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseWindows {
    pub name: PhaseWindow,
    pub surname: PhaseWindow,
    pub email: PhaseWindow,
    pub phone: PhaseWindow,
}

impl Default for PhaseWindows {
    fn default() -> Self {
        Self {
            name: PhaseWindow { start: 0.05, end: 0.35 },
            surname: PhaseWindow { start: 0.25, end: 0.55 },
            email: PhaseWindow { start: 0.45, end: 0.75 },
            phone: PhaseWindow { start: 0.65, end: 0.92 },
        }
    }
}

impl PhaseWindows {
    pub fn get(&self, field: Field) -> PhaseWindow {
        match field {
            Field::Name => self.name,
            Field::Surname => self.surname,
            Field::Email => self.email,
            Field::Phone => self.phone,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for field in Field::ALL {
            if let Err(err) = self.get(field).validate() {
                bail!("{} window: {err}", field.label());
            }
        }
        Ok(())
    }
}

/// How an assembling field shows its partial value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RevealPolicy {
    /// Left-to-right prefix with a blinking cursor.
    Prefix,
    /// Full-length string; unlocked positions re-roll every tick.
    #[default]
    Scramble,
}
