pub mod upload;
pub mod video;
