use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次外部指令 (systemctl / journalctl ...) 的結果，原樣輸出用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    /// shell 找不到指令時回報的退出碼
    pub const NOT_FOUND_EXIT_CODE: i32 = 127;

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn spawn_failure(command: String, error: &std::io::Error) -> Self {
        let stderr = format!("{}: {}\n", command, error);
        Self {
            command,
            exit_code: Self::NOT_FOUND_EXIT_CODE,
            stdout: String::new(),
            stderr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    Test,
    #[value(name = "v4l2")]
    V4l2,
    Libcamera,
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraSource::Test => "test",
            CameraSource::V4l2 => "v4l2",
            CameraSource::Libcamera => "libcamera",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    None,
    Test,
    Alsa,
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorbellState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl DoorbellState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorbellState::Stopped => "stopped",
            DoorbellState::Starting => "starting",
            DoorbellState::Running => "running",
            DoorbellState::Stopping => "stopping",
            DoorbellState::Error => "error",
        }
    }
}

impl fmt::Display for DoorbellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamStats {
    pub is_running: bool,
    pub rtsp_url: String,
    pub resolution: String,
    pub framerate: u32,
    pub bitrate: u32,
    pub pid: Option<u32>,
    pub cpu_usage: Option<f32>,
    pub memory_usage_mb: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    pub streaming: bool,
    pub stats: Option<StreamStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioStatus {
    pub enabled: bool,
    pub capturing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonStatus {
    pub enabled: bool,
    pub last_press: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatterStatus {
    pub enabled: bool,
    pub commissioned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoorbellStatus {
    pub state: DoorbellState,
    pub uptime_seconds: u64,
    pub camera: CameraStatus,
    pub audio: AudioStatus,
    pub button: ButtonStatus,
    pub matter: MatterStatus,
    pub checked_at: DateTime<Utc>,
}
