use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    rain::RainConfig,
    reveal::{PhaseWindows, RevealPolicy},
    scan::{
        AssetResolver, FsAssetResolver, ImageHandle, PassthroughResolver, ScanActivation, ScanPool,
    },
};

/// Every constant the engine runs on. Loaded once; never negotiated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub duration_ms: u64,
    pub tick_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub scan_interval_ms: u64,
    pub scan_activation: ScanActivation,
    pub reveal_policy: RevealPolicy,
    pub windows: PhaseWindows,
    pub idle_intensity: f32,
    /// Running intensity decays linearly from 1.0 to this value.
    pub final_intensity: f32,
    pub flavor_chance: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub rain: RainConfig,
    pub scan_pool: ScanPool,
    pub final_image: ImageHandle,
    pub placeholder_image: ImageHandle,
    /// When set, handles are probed as image files under this directory.
    pub asset_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duration_ms: 60_000,
            tick_interval_ms: 200,
            frame_interval_ms: 16,
            scan_interval_ms: 55,
            scan_activation: ScanActivation::default(),
            reveal_policy: RevealPolicy::default(),
            windows: PhaseWindows::default(),
            idle_intensity: 0.65,
            final_intensity: 0.75,
            flavor_chance: 0.12,
            viewport_width: 960,
            viewport_height: 540,
            rain: RainConfig::default(),
            scan_pool: ScanPool::default(),
            final_image: ImageHandle::new("final.jpg"),
            placeholder_image: ImageHandle::new("placeholder.svg"),
            asset_root: None,
        }
    }
}

impl EngineConfig {
    /// Reads JSON from `path`, or returns defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            log::info!("no config at {}, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration_ms == 0 {
            bail!("durationMs must be greater than zero");
        }
        for (name, value) in [
            ("tickIntervalMs", self.tick_interval_ms),
            ("frameIntervalMs", self.frame_interval_ms),
            ("scanIntervalMs", self.scan_interval_ms),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        self.windows.validate()?;
        if self.scan_pool.contains(&self.final_image) {
            bail!("final image {} must not be part of the scan pool", self.final_image);
        }
        if !(0.0..=1.0).contains(&self.flavor_chance) {
            bail!("flavorChance must lie within [0, 1]");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Rain intensity at progress `t` of a running session.
    pub fn running_intensity(&self, t: f64) -> f32 {
        1.0 - (t.clamp(0.0, 1.0) as f32) * (1.0 - self.final_intensity)
    }

    pub fn resolver(&self) -> Arc<dyn AssetResolver> {
        match &self.asset_root {
            Some(root) => Arc::new(FsAssetResolver::new(root.clone())),
            None => Arc::new(PassthroughResolver),
        }
    }
}
