use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoorbellError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to spawn '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Streaming error: {message}")]
    StreamError { message: String },

    #[error("Audio error: {message}")]
    AudioError { message: String },
}

impl DoorbellError {
    /// 給操作人員的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DoorbellError::IoError(_) => "Check file permissions and that the path exists",
            DoorbellError::SerializationError(_) => "Report this as a bug with the debug log attached",
            DoorbellError::ConfigError { .. }
            | DoorbellError::MissingConfigError { .. }
            | DoorbellError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and restart the service"
            }
            DoorbellError::SpawnError { .. } => {
                "Make sure GStreamer (gst-launch-1.0) and alsa-utils are installed and on PATH"
            }
            DoorbellError::StreamError { .. } => {
                "Check that MediaMTX is running: systemctl status mediamtx"
            }
            DoorbellError::AudioError { .. } => "Check the audio device with: arecord -l",
        }
    }

    /// 程序退出碼：設定錯誤 2，執行期錯誤 1
    pub fn exit_code(&self) -> i32 {
        match self {
            DoorbellError::ConfigError { .. }
            | DoorbellError::MissingConfigError { .. }
            | DoorbellError::InvalidConfigValueError { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DoorbellError>;
