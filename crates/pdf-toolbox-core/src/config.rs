use serde::{Deserialize, Serialize};

/// Default longest image side for `CompressionMode::Downscale`
pub const DEFAULT_MAX_DIMENSION_PX: u32 = 2000;
/// Default JPEG quality for `CompressionMode::Downscale`
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
/// Default global page-size policy for command-line merges
pub const DEFAULT_PAGE_SIZE: &str = "largest";
/// Default OAuth redirect for local development
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/drive/callback";

/// Upload limits and the lifetime of stored session uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum request body size in megabytes
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,

    /// Total size of the session upload store in megabytes
    #[serde(default = "default_store_max_mb")]
    pub store_max_mb: u64,

    /// Seconds a stored upload survives without being replaced (0 = no expiry)
    #[serde(default = "default_store_ttl_seconds")]
    pub store_ttl_seconds: u64,
}

const fn default_max_body_mb() -> usize {
    500
}

const fn default_store_max_mb() -> u64 {
    512
}

const fn default_store_ttl_seconds() -> u64 {
    3600
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_mb: default_max_body_mb(),
            store_max_mb: default_store_max_mb(),
            store_ttl_seconds: default_store_ttl_seconds(),
        }
    }
}

/// Defaults for the compression dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressConfig {
    #[serde(default = "default_max_dimension_px")]
    pub max_dimension_px: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

const fn default_max_dimension_px() -> u32 {
    DEFAULT_MAX_DIMENSION_PX
}

const fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Defaults for the merge driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Global page-size token used by the CLI when none is given
    #[serde(default = "default_page_size")]
    pub default_page_size: String,
}

fn default_page_size() -> String {
    DEFAULT_PAGE_SIZE.to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

/// Google Drive OAuth client configuration.
///
/// The integration is disabled while `client_id` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// HTTP timeout for Drive and token requests
    #[serde(default = "default_drive_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

const fn default_drive_timeout_secs() -> u64 {
    60
}

impl DriveConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            timeout_secs: default_drive_timeout_secs(),
        }
    }

    /// Whether OAuth client credentials are present
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::new("", "", default_redirect_uri())
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub compress: CompressConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub drive: DriveConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-toolbox/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-toolbox").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the compression and upload paths cannot work with.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if !(1..=100).contains(&self.compress.jpeg_quality) {
            return Err(crate::error::Error::ConfigInvalid {
                field: "compress.jpeg_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }
        if self.compress.max_dimension_px == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "compress.max_dimension_px".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.upload.max_body_mb == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "upload.max_body_mb".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [compress]
            jpeg_quality = 60

            [drive]
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.compress.jpeg_quality, 60);
        assert_eq!(config.compress.max_dimension_px, DEFAULT_MAX_DIMENSION_PX);
        assert_eq!(config.upload.max_body_mb, 500);
        assert_eq!(config.merge.default_page_size, "largest");
        assert!(config.drive.is_configured());
        assert_eq!(config.drive.redirect_uri, DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = AppConfig::default();
        config.compress.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.compress.jpeg_quality = 75;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upload]\nstore_ttl_seconds = 10\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.upload.store_ttl_seconds, 10);
        assert!(!config.drive.is_configured());
    }
}
