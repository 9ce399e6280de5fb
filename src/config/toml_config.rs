use crate::domain::model::{AudioSource, CameraSource};
use crate::utils::error::{DoorbellError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// ops 工具讀取設定檔路徑用的環境變數
pub const CONFIG_ENV_VAR: &str = "DOORBELL_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorbellConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub rtsp: RtspConfig,
    pub button: ButtonConfig,
    pub matter: MatterConfig,
    pub substream: SubstreamConfig,
    pub ops: OpsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub source: CameraSource,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub bitrate: u32,
    pub hardware_encoding: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            source: CameraSource::Test,
            device: "/dev/video0".to_string(),
            width: 1920,
            height: 1080,
            framerate: 30,
            bitrate: 2_000_000,
            hardware_encoding: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub source: AudioSource,
    pub device: Option<String>,
    pub bitrate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: AudioSource::None,
            device: None,
            bitrate: 64_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtspConfig {
    pub host: String,
    pub port: u16,
    pub stream_name: String,
    /// 執行 pipeline 的指令，pipeline 字串會附加在最後
    pub launch_command: Vec<String>,
}

impl Default for RtspConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8554,
            stream_name: "doorbell".to_string(),
            launch_command: vec!["gst-launch-1.0".to_string(), "-e".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub enabled: bool,
    pub gpio_pin: u8,
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gpio_pin: 17,
            debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatterConfig {
    pub enabled: bool,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for MatterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            vendor_id: 0xFFF1,
            product_id: 0x8001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstreamConfig {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub bitrate: u32,
}

impl Default for SubstreamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 640,
            height: 480,
            framerate: 10,
            bitrate: 500_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub service_unit: String,
    pub relay_unit: String,
    pub log_lines: usize,
    pub settle_delay_ms: u64,
    pub use_sudo: bool,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            service_unit: "doorbell".to_string(),
            relay_unit: "mediamtx".to_string(),
            log_lines: 20,
            settle_delay_ms: 2000,
            use_sudo: true,
        }
    }
}

impl OpsConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl DoorbellConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DoorbellError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DoorbellError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// ops 工具用：有 `DOORBELL_CONFIG` 就讀檔，否則用預設值
    pub fn load_for_ops() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load_ops_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// 讀檔並驗證，空的 unit 名稱或 log_lines = 0 直接拒絕
    pub fn load_ops_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate_config()?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${RTSP_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DoorbellError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn rtsp_url(&self) -> String {
        format!(
            "rtsp://{}:{}/{}",
            self.rtsp.host, self.rtsp.port, self.rtsp.stream_name
        )
    }

    /// 未啟用時一律視為沒有音訊來源
    pub fn effective_audio_source(&self) -> AudioSource {
        if self.audio.enabled {
            self.audio.source
        } else {
            AudioSource::None
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("video.device", &self.video.device)?;
        validation::validate_range("video.width", self.video.width, 160, 3840)?;
        validation::validate_range("video.height", self.video.height, 120, 2160)?;
        validation::validate_range("video.framerate", self.video.framerate, 1, 120)?;
        validation::validate_positive_number("video.bitrate", u64::from(self.video.bitrate), 64_000)?;

        if self.audio.enabled {
            if self.audio.source == AudioSource::None {
                return Err(DoorbellError::InvalidConfigValueError {
                    field: "audio.source".to_string(),
                    value: "none".to_string(),
                    reason: "Audio is enabled but no source is selected".to_string(),
                });
            }
            // Opus 支援 6 ~ 510 kbps
            validation::validate_range("audio.bitrate", self.audio.bitrate, 6_000, 510_000)?;
            if let Some(device) = &self.audio.device {
                validation::validate_non_empty_string("audio.device", device)?;
            }
        }

        validation::validate_non_empty_string("rtsp.host", &self.rtsp.host)?;
        validation::validate_positive_number("rtsp.port", u64::from(self.rtsp.port), 1)?;
        validation::validate_stream_name("rtsp.stream_name", &self.rtsp.stream_name)?;
        validation::validate_rtsp_url("rtsp", &self.rtsp_url())?;
        let launcher = self.rtsp.launch_command.first().map(String::as_str).unwrap_or("");
        validation::validate_non_empty_string("rtsp.launch_command", launcher)?;

        // Raspberry Pi BCM GPIO 0..27
        validation::validate_range("button.gpio_pin", self.button.gpio_pin, 0, 27)?;

        if self.substream.enabled {
            validation::validate_range("substream.width", self.substream.width, 160, self.video.width)?;
            validation::validate_range("substream.height", self.substream.height, 120, self.video.height)?;
            validation::validate_range("substream.framerate", self.substream.framerate, 1, self.video.framerate)?;
        }

        validation::validate_non_empty_string("ops.service_unit", &self.ops.service_unit)?;
        validation::validate_non_empty_string("ops.relay_unit", &self.ops.relay_unit)?;
        validation::validate_positive_number("ops.log_lines", self.ops.log_lines as u64, 1)?;

        Ok(())
    }
}

impl Validate for DoorbellConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_reference_device() {
        let config = DoorbellConfig::default();

        assert_eq!(config.video.source, CameraSource::Test);
        assert_eq!((config.video.width, config.video.height), (1920, 1080));
        assert_eq!(config.video.framerate, 30);
        assert_eq!(config.video.bitrate, 2_000_000);
        assert!(!config.video.hardware_encoding);
        assert_eq!(config.audio.source, AudioSource::None);
        assert_eq!(config.rtsp_url(), "rtsp://127.0.0.1:8554/doorbell");
        assert_eq!(config.button.gpio_pin, 17);
        assert_eq!(config.matter.vendor_id, 0xFFF1);
        assert_eq!(config.ops.log_lines, 20);
        assert_eq!(config.ops.settle_delay(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[video]
source = "libcamera"
hardware_encoding = true

[audio]
enabled = true
source = "alsa"
device = "hw:1,0"

[rtsp]
host = "doorbell.local"
"#;

        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.video.source, CameraSource::Libcamera);
        assert!(config.video.hardware_encoding);
        assert_eq!(config.video.width, 1920);
        assert_eq!(config.effective_audio_source(), AudioSource::Alsa);
        assert_eq!(config.audio.device.as_deref(), Some("hw:1,0"));
        assert_eq!(config.rtsp_url(), "rtsp://doorbell.local:8554/doorbell");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_audio_has_no_source() {
        let toml_content = r#"
[audio]
enabled = false
source = "test"
"#;
        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.effective_audio_source(), AudioSource::None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DOORBELL_TEST_STREAM_NAME", "frontdoor");

        let toml_content = r#"
[rtsp]
stream_name = "${DOORBELL_TEST_STREAM_NAME}"
"#;

        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.rtsp.stream_name, "frontdoor");

        std::env::remove_var("DOORBELL_TEST_STREAM_NAME");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[video]
framerate = 0
"#;
        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[audio]
enabled = true
source = "none"
"#;
        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[rtsp]
launch_command = []
"#;
        let config = DoorbellConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_camera_source_is_rejected() {
        let toml_content = r#"
[video]
source = "webcam"
"#;
        assert!(matches!(
            DoorbellConfig::from_toml_str(toml_content),
            Err(DoorbellError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[ops]
service_unit = "doorbell-dev"
settle_delay_ms = 500
use_sudo = false
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = DoorbellConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.ops.service_unit, "doorbell-dev");
        assert_eq!(config.ops.relay_unit, "mediamtx");
        assert_eq!(config.ops.settle_delay(), Duration::from_millis(500));
        assert!(!config.ops.use_sudo);
    }

    #[test]
    fn test_ops_file_rejects_unusable_queries() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[ops]\nservice_unit = \"\"\nlog_lines = 0\n")
            .unwrap();

        assert!(DoorbellConfig::from_file(temp_file.path()).is_ok());
        assert!(matches!(
            DoorbellConfig::load_ops_file(temp_file.path()),
            Err(DoorbellError::InvalidConfigValueError { .. })
        ));
    }
}
