use serde::{Deserialize, Serialize};

/// Blob storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    Cloudinary,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Local => "local",
            ProviderType::Cloudinary => "cloudinary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(ProviderType::Local),
            "cloudinary" => Some(ProviderType::Cloudinary),
            _ => None,
        }
    }
}
