//! Cloudinary storage provider
//!
//! Signed direct uploads against the Cloudinary REST upload API.

pub mod provider;
pub mod signer;

pub use provider::CloudinaryStorage;
