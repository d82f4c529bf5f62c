pub mod assets;
pub mod cycler;

pub use assets::{AssetResolver, FsAssetResolver, ImageHandle, PassthroughResolver, ResolvedAsset};
pub use cycler::{ScanActivation, ScanCycler, ScanPool, ScanStage, ScanView};
