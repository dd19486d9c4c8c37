pub mod asset;
pub mod owner;
pub mod storage;
pub mod video;

pub use asset::*;
pub use owner::*;
pub use storage::*;
pub use video::*;
