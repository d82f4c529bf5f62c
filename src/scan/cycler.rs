use std::{collections::HashSet, sync::Arc};

use anyhow::{bail, Result};
use rand::{seq::SliceRandom, Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::assets::{AssetResolver, ImageHandle};

// Set to true to trace every cycle step
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// When the scan opens during a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanActivation {
    /// Opens once at most this many milliseconds remain.
    LastMs(u64),
    FromStart,
}

impl Default for ScanActivation {
    fn default() -> Self {
        ScanActivation::LastMs(12_000)
    }
}

impl ScanActivation {
    pub fn is_open(&self, elapsed_ms: u64, duration_ms: u64) -> bool {
        match self {
            ScanActivation::FromStart => true,
            ScanActivation::LastMs(window) => duration_ms.saturating_sub(elapsed_ms) <= *window,
        }
    }
}

/// Ordered, non-empty set of handles the scan cycles through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ImageHandle>", into = "Vec<ImageHandle>")]
pub struct ScanPool {
    handles: Vec<ImageHandle>,
}

impl ScanPool {
    pub fn new(handles: Vec<ImageHandle>) -> Result<Self> {
        if handles.is_empty() {
            bail!("scan pool needs at least one image handle");
        }
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, cursor: usize) -> &ImageHandle {
        &self.handles[cursor % self.handles.len()]
    }

    pub fn contains(&self, handle: &ImageHandle) -> bool {
        self.handles.contains(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageHandle> {
        self.handles.iter()
    }
}

impl TryFrom<Vec<ImageHandle>> for ScanPool {
    type Error = anyhow::Error;

    fn try_from(handles: Vec<ImageHandle>) -> Result<Self> {
        Self::new(handles)
    }
}

impl From<ScanPool> for Vec<ImageHandle> {
    fn from(pool: ScanPool) -> Self {
        pool.handles
    }
}

impl Default for ScanPool {
    fn default() -> Self {
        Self {
            handles: (1..=6)
                .map(|idx| ImageHandle::new(format!("scan/face-{idx:02}.jpg")))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanStage {
    Standby,
    Scanning,
    Locked,
}

impl ScanStage {
    pub fn label(&self) -> &'static str {
        match self {
            ScanStage::Standby => "standby",
            ScanStage::Scanning => "scanning",
            ScanStage::Locked => "locked",
        }
    }
}

/// What the presentation layer shows for the scan panel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanView {
    pub stage: ScanStage,
    pub label: String,
    /// Handle the cycle selected; `None` before the first activation.
    pub requested: Option<ImageHandle>,
    /// Handle to actually draw. The placeholder when `requested` failed to resolve.
    pub shown: Option<ImageHandle>,
    pub score: f64,
    pub bar_width: f64,
    pub hint: String,
}

pub const DEFAULT_HINTS: &[&str] = &[
    "aligning facial landmarks",
    "cross-referencing archive frames",
    "sampling public imagery",
    "resolving identity vector",
    "matching biometric mesh",
];

/// Rapid image flip-through, independent of session progress.
pub struct ScanCycler {
    pool: ScanPool,
    final_handle: ImageHandle,
    placeholder: ImageHandle,
    resolver: Arc<dyn AssetResolver>,
    hints: Vec<String>,
    hint_chance: f64,
    broken: HashSet<ImageHandle>,
    preloaded: bool,
    stage: ScanStage,
    cursor: usize,
    advances: u64,
    requested: Option<ImageHandle>,
    score: f64,
    bar_width: f64,
    hint: String,
}

impl ScanCycler {
    pub fn new(
        pool: ScanPool,
        final_handle: ImageHandle,
        placeholder: ImageHandle,
        resolver: Arc<dyn AssetResolver>,
    ) -> Self {
        let hints: Vec<String> = DEFAULT_HINTS.iter().map(|hint| hint.to_string()).collect();
        Self {
            pool,
            final_handle,
            placeholder,
            resolver,
            hint: hints[0].clone(),
            hints,
            hint_chance: 0.2,
            broken: HashSet::new(),
            preloaded: false,
            stage: ScanStage::Standby,
            cursor: 0,
            advances: 0,
            requested: None,
            score: 0.0,
            bar_width: 0.0,
        }
    }

    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.stage == ScanStage::Scanning
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn advances(&self) -> u64 {
        self.advances
    }

    pub fn final_handle(&self) -> &ImageHandle {
        &self.final_handle
    }

    /// Starts cycling. Returns `false` when already scanning or locked.
    pub fn activate(&mut self) -> bool {
        if self.stage != ScanStage::Standby {
            return false;
        }

        self.preload_assets();
        self.stage = ScanStage::Scanning;
        self.requested = Some(self.pool.get(self.cursor).clone());
        log::info!("scan cycler active over {} handles", self.pool.len());
        true
    }

    /// Stops cycling without locking. Safe while inactive.
    pub fn deactivate(&mut self) {
        if self.stage == ScanStage::Scanning {
            self.stage = ScanStage::Standby;
        }
    }

    /// One fast tick. No-op unless scanning.
    pub fn advance(&mut self, rng: &mut dyn RngCore) -> bool {
        if self.stage != ScanStage::Scanning {
            return false;
        }

        self.cursor = (self.cursor + 1) % self.pool.len();
        self.advances += 1;
        self.requested = Some(self.pool.get(self.cursor).clone());
        self.score = rng.gen::<f64>();
        self.bar_width = rng.gen_range(12.0..100.0);
        if rng.gen_bool(self.hint_chance) {
            if let Some(hint) = self.hints.choose(rng) {
                self.hint = hint.clone();
            }
        }

        log_debug!("scan cursor {} -> {:?}", self.cursor, self.requested);
        true
    }

    /// Pins the final handle at 100%. Works from any stage; returns whether
    /// the cycle was running.
    pub fn lock(&mut self) -> bool {
        let was_active = self.is_active();
        self.preload_assets();
        let final_handle = self.final_handle.clone();

        self.stage = ScanStage::Locked;
        self.requested = Some(final_handle);
        self.score = 1.0;
        self.bar_width = 100.0;
        was_active
    }

    pub fn reset(&mut self) {
        self.stage = ScanStage::Standby;
        self.cursor = 0;
        self.advances = 0;
        self.requested = None;
        self.score = 0.0;
        self.bar_width = 0.0;
        self.hint = self.hints[0].clone();
        self.broken.clear();
        self.preloaded = false;
    }

    /// Resolves every pool handle and the final handle once, marking failures
    /// so they draw as the placeholder. Later calls are no-ops until `reset`.
    pub fn preload_assets(&mut self) {
        if self.preloaded {
            return;
        }
        let handles: Vec<ImageHandle> = self
            .pool
            .iter()
            .chain(std::iter::once(&self.final_handle))
            .cloned()
            .collect();
        for handle in &handles {
            self.preload(handle);
        }
        self.preloaded = true;
    }

    /// The handle to draw for `handle`: itself, or the placeholder when broken.
    pub fn displayable(&self, handle: &ImageHandle) -> ImageHandle {
        if self.broken.contains(handle) {
            self.placeholder.clone()
        } else {
            handle.clone()
        }
    }

    pub fn view(&self) -> ScanView {
        let label = match self.stage {
            ScanStage::Locked => "locked 100%".to_string(),
            stage => format!("{} {:>3.0}%", stage.label(), self.score * 100.0),
        };
        ScanView {
            stage: self.stage,
            label,
            requested: self.requested.clone(),
            shown: self.requested.as_ref().map(|handle| self.displayable(handle)),
            score: self.score,
            bar_width: self.bar_width,
            hint: self.hint.clone(),
        }
    }

    fn preload(&mut self, handle: &ImageHandle) {
        if let Err(err) = self.resolver.resolve(handle) {
            log::info!("image {handle} unavailable, using placeholder: {err:#}");
            self.broken.insert(handle.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::assets::{PassthroughResolver, ResolvedAsset};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RejectAll;

    impl AssetResolver for RejectAll {
        fn resolve(&self, handle: &ImageHandle) -> Result<ResolvedAsset> {
            bail!("no such asset: {handle}")
        }
    }

    /// Rejects one handle and counts every lookup.
    struct RejectOne {
        handle: &'static str,
        lookups: AtomicUsize,
    }

    impl RejectOne {
        fn new(handle: &'static str) -> Self {
            Self {
                handle,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl AssetResolver for RejectOne {
        fn resolve(&self, handle: &ImageHandle) -> Result<ResolvedAsset> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if handle.as_str() == self.handle {
                bail!("no such asset: {handle}");
            }
            Ok(ResolvedAsset {
                width: 1,
                height: 1,
            })
        }
    }

    fn cycler(resolver: Arc<dyn AssetResolver>) -> ScanCycler {
        ScanCycler::new(
            ScanPool::default(),
            ImageHandle::new("final.jpg"),
            ImageHandle::new("placeholder.svg"),
            resolver,
        )
    }

    #[test]
    fn activation_is_idempotent_and_deactivate_is_safe() {
        let mut scan = cycler(Arc::new(PassthroughResolver));
        scan.deactivate();
        assert_eq!(scan.stage(), ScanStage::Standby);

        assert!(scan.activate());
        assert!(!scan.activate());
        assert!(scan.is_active());

        scan.deactivate();
        scan.deactivate();
        assert!(!scan.is_active());
    }

    #[test]
    fn fast_ticks_wrap_the_pool_then_lock_on_final() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut scan = cycler(Arc::new(PassthroughResolver));
        let pool = ScanPool::default();
        assert_eq!(pool.len(), 6);
        scan.activate();

        let mut cursors = Vec::new();
        let mut elapsed = 0;
        while elapsed + 55 <= 600 {
            elapsed += 55;
            assert!(scan.advance(&mut rng));
            let view = scan.view();
            let shown = view.shown.expect("scanning shows a handle");
            assert!(pool.contains(&shown));
            assert!((0.0..1.0).contains(&view.score));
            assert!((12.0..100.0).contains(&view.bar_width));
            cursors.push(scan.cursor());
        }

        assert!(scan.advances() > 6);
        assert!(cursors.windows(2).any(|pair| pair[1] < pair[0]), "cursor wrapped");

        assert!(scan.lock());
        let view = scan.view();
        assert_eq!(view.stage, ScanStage::Locked);
        assert_eq!(view.shown, Some(ImageHandle::new("final.jpg")));
        assert!(!pool.contains(&ImageHandle::new("final.jpg")));
        assert_eq!(view.score, 1.0);
        assert_eq!(view.label, "locked 100%");
        assert!(!scan.advance(&mut rng));
    }

    #[test]
    fn lock_without_activation_still_pins_final() {
        let mut scan = cycler(Arc::new(PassthroughResolver));
        assert!(!scan.lock());
        assert_eq!(scan.view().shown, Some(ImageHandle::new("final.jpg")));
        assert!(!scan.activate());
    }

    #[test]
    fn unresolvable_images_fall_back_to_placeholder() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scan = cycler(Arc::new(RejectAll));
        scan.activate();
        scan.advance(&mut rng);

        let view = scan.view();
        assert!(ScanPool::default().contains(view.requested.as_ref().unwrap()));
        assert_eq!(view.shown, Some(ImageHandle::new("placeholder.svg")));

        scan.lock();
        assert_eq!(scan.view().shown, Some(ImageHandle::new("placeholder.svg")));
    }

    #[test]
    fn broken_final_image_falls_back_after_an_active_scan() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut scan = cycler(Arc::new(RejectOne::new("final.jpg")));
        scan.activate();
        scan.advance(&mut rng);
        assert_ne!(scan.view().shown, Some(ImageHandle::new("placeholder.svg")));

        assert!(scan.lock());
        let view = scan.view();
        assert_eq!(view.requested, Some(ImageHandle::new("final.jpg")));
        assert_eq!(view.shown, Some(ImageHandle::new("placeholder.svg")));
        assert_eq!(
            scan.displayable(scan.final_handle()),
            ImageHandle::new("placeholder.svg")
        );
    }

    #[test]
    fn assets_resolve_once_per_session() {
        let resolver = Arc::new(RejectOne::new("final.jpg"));
        let mut scan = cycler(resolver.clone());
        scan.preload_assets();
        let lookups = resolver.lookups.load(Ordering::SeqCst);
        assert_eq!(lookups, ScanPool::default().len() + 1);

        scan.activate();
        scan.lock();
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), lookups);

        scan.reset();
        scan.preload_assets();
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), lookups * 2);
    }

    #[test]
    fn activation_policies() {
        assert!(ScanActivation::FromStart.is_open(0, 30_000));
        let last = ScanActivation::LastMs(5_000);
        assert!(!last.is_open(24_999, 30_000));
        assert!(last.is_open(25_000, 30_000));
        assert!(last.is_open(30_000, 30_000));
    }

    #[test]
    fn pool_rejects_empty_lists() {
        assert!(ScanPool::new(Vec::new()).is_err());
        let parsed: std::result::Result<ScanPool, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
        let parsed: ScanPool = serde_json::from_str(r#"["a.png","b.png"]"#).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
