pub mod dedup;
pub mod fingerprint;
pub mod registry;
pub mod video;

pub use registry::AssetRegistry;
pub use video::VideoService;
