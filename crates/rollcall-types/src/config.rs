use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{RollcallError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub timeout_secs: u64,
    pub warning_secs: u64,
    pub poll_interval_secs: u64,
    pub tick_ms: u64,
    pub redirect_delay_ms: u64,
    pub logout_path: String,
    pub expired_redirect: String,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn warning_window(&self) -> Duration {
        Duration::from_secs(self.warning_secs)
    }

    /// Inactivity after which the warning modal appears.
    pub fn warning_after(&self) -> Duration {
        self.timeout().saturating_sub(self.warning_window())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120 * 60,
            warning_secs: 5 * 60,
            poll_interval_secs: 60,
            tick_ms: 1_000,
            redirect_delay_ms: 2_000,
            logout_path: "/logout".into(),
            expired_redirect: "/?message=session_expired".into(),
        }
    }
}

/// Largest accepted `camera.width` or `camera.height`, in pixels.
pub const MAX_FRAME_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    #[serde(default)]
    pub frames_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationFlavor {
    /// Generic numbered image slots.
    #[default]
    Slots,
    /// Named head angles with capture instructions.
    Angles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Delete server-held face data, then clear local state.
    #[default]
    Full,
    /// Clear local state only; the next status load restores server slots.
    LocalOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub required_images: usize,
    #[serde(default)]
    pub flavor: RegistrationFlavor,
    #[serde(default)]
    pub reset_scope: ResetScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub feed_capacity: usize,
    pub default_subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    #[serde(default)]
    pub capture_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollcallConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub camera: CameraConfig,
    pub registration: RegistrationConfig,
    pub capture: CaptureConfig,
    pub ops: OpsConfig,
}

impl RollcallConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            RollcallError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            RollcallError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server.base_url).map_err(|err| {
            RollcallError::Configuration(format!("server.base_url is not a valid URL: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RollcallError::Configuration(
                "server.base_url must use http or https".into(),
            ));
        }
        if self.session.warning_secs == 0 {
            return Err(RollcallError::Configuration(
                "session.warning_secs must be greater than zero".into(),
            ));
        }
        if self.session.timeout_secs <= self.session.warning_secs {
            return Err(RollcallError::Configuration(
                "session.timeout_secs must exceed session.warning_secs".into(),
            ));
        }
        if self.session.poll_interval_secs == 0 || self.session.tick_ms == 0 {
            return Err(RollcallError::Configuration(
                "session.poll_interval_secs and session.tick_ms must be greater than zero".into(),
            ));
        }
        if !(1..=16).contains(&self.registration.required_images) {
            return Err(RollcallError::Configuration(
                "registration.required_images must be between 1 and 16".into(),
            ));
        }
        if self.capture.feed_capacity == 0 {
            return Err(RollcallError::Configuration(
                "capture.feed_capacity must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_FRAME_DIMENSION).contains(&self.camera.width)
            || !(1..=MAX_FRAME_DIMENSION).contains(&self.camera.height)
        {
            return Err(RollcallError::Configuration(format!(
                "camera.width and camera.height must be between 1 and {MAX_FRAME_DIMENSION}"
            )));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(RollcallError::Configuration(
                "camera.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://127.0.0.1:5000".into(),
                request_timeout_ms: 10_000,
            },
            session: SessionConfig::default(),
            camera: CameraConfig {
                width: 640,
                height: 480,
                jpeg_quality: 92,
                frames_dir: None,
            },
            registration: RegistrationConfig {
                required_images: 4,
                flavor: RegistrationFlavor::Slots,
                reset_scope: ResetScope::Full,
            },
            capture: CaptureConfig {
                feed_capacity: 10,
                default_subject: "General".into(),
            },
            ops: OpsConfig {
                log_level: "info".into(),
                capture_dir: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_rollcall_config_from_file() {
        let temp_path = std::env::temp_dir().join("rollcall-config-test.toml");
        let mut config = RollcallConfig::default();
        config.server.base_url = "https://attendance.example.edu".into();
        config.registration.flavor = RegistrationFlavor::Angles;
        config.registration.reset_scope = ResetScope::LocalOnly;
        config.session.timeout_secs = 600;
        config.session.warning_secs = 60;

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = RollcallConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.server.base_url, config.server.base_url);
        assert_eq!(loaded.registration.flavor, RegistrationFlavor::Angles);
        assert_eq!(loaded.registration.reset_scope, ResetScope::LocalOnly);
        assert_eq!(loaded.session.warning_after(), Duration::from_secs(540));
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn session_section_defaults_when_missing() {
        let doc = r#"
            [server]
            base_url = "http://localhost:5000"
            request_timeout_ms = 5000

            [camera]
            width = 640
            height = 480
            jpeg_quality = 90

            [registration]
            required_images = 4

            [capture]
            feed_capacity = 10
            default_subject = "Math"

            [ops]
            log_level = "debug"
        "#;
        let config: RollcallConfig = toml::from_str(doc).expect("parse config");
        assert_eq!(config.session.timeout(), Duration::from_secs(7200));
        assert_eq!(config.session.warning_after(), Duration::from_secs(6900));
        assert_eq!(config.registration.flavor, RegistrationFlavor::Slots);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = RollcallConfig::default();
        assert!(config.validate().is_ok());

        config.server.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());
        config.server.base_url = "http://127.0.0.1:5000".into();

        config.session.warning_secs = config.session.timeout_secs;
        assert!(config.validate().is_err());
        config.session.warning_secs = 300;

        config.registration.required_images = 0;
        assert!(config.validate().is_err());
        config.registration.required_images = 4;

        config.capture.feed_capacity = 0;
        assert!(config.validate().is_err());
        config.capture.feed_capacity = 10;

        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.camera.jpeg_quality = 92;
        assert!(config.validate().is_ok());

        config.camera.width = 0;
        assert!(config.validate().is_err());
        config.camera.width = u32::MAX;
        assert!(config.validate().is_err());
        config.camera.width = 640;
        config.camera.height = MAX_FRAME_DIMENSION + 1;
        assert!(config.validate().is_err());
        config.camera.height = 480;
        assert!(config.validate().is_ok());
    }
}
