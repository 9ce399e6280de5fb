use crate::config::toml_config::DoorbellConfig;
use crate::domain::model::CameraSource;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "doorbell")]
#[command(about = "Smart Video Doorbell Service")]
pub struct ServiceArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use test pattern video source
    #[arg(long)]
    pub test_pattern: bool,

    /// Camera source (overrides the configuration file)
    #[arg(long, value_enum)]
    pub camera: Option<CameraSource>,

    /// Emit JSON logs (for journald)
    #[arg(long)]
    pub log_json: bool,
}

impl ServiceArgs {
    /// 命令列參數覆蓋設定檔；`--test-pattern` 優先於 `--camera`
    pub fn apply_overrides(&self, config: &mut DoorbellConfig) {
        if let Some(camera) = self.camera {
            config.video.source = camera;
            tracing::info!("🔧 Camera source overridden to: {}", camera);
        }

        if self.test_pattern {
            config.video.source = CameraSource::Test;
            tracing::info!("🔧 Test pattern forced");
        }
    }
}
