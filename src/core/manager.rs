use crate::config::toml_config::DoorbellConfig;
use crate::core::pipeline::StreamSettings;
use crate::core::streamer::CameraStreamer;
use crate::domain::model::{
    AudioStatus, ButtonStatus, CameraStatus, DoorbellState, DoorbellStatus, MatterStatus,
};
use crate::utils::error::{DoorbellError, Result};
use crate::utils::monitor::ProcessMonitor;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Level;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// 協調門鈴各子系統。目前只有影像串流；按鈕、Matter、子串流只讀設定。
pub struct DoorbellManager {
    config: DoorbellConfig,
    state: DoorbellState,
    camera: Option<CameraStreamer>,
    started_at: Option<Instant>,
    monitor: Option<ProcessMonitor>,
}

impl DoorbellManager {
    pub fn new(config: DoorbellConfig) -> Self {
        tracing::info!("Doorbell manager initialized");
        tracing::debug!("Config: {:?}", config);

        Self {
            config,
            state: DoorbellState::Stopped,
            camera: None,
            started_at: None,
            monitor: ProcessMonitor::current_process(),
        }
    }

    pub fn state(&self) -> DoorbellState {
        self.state
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.state == DoorbellState::Running {
            tracing::warn!("Doorbell already running");
            return Ok(());
        }

        tracing::info!("Starting doorbell...");
        self.state = DoorbellState::Starting;
        self.warn_unsupported_subsystems();

        if let Err(e) = self.start_camera().await {
            tracing::error!("Failed to start doorbell: {}", e);
            self.state = DoorbellState::Error;
            self.stop().await;
            return Err(e);
        }

        self.state = DoorbellState::Running;
        self.started_at = Some(Instant::now());
        tracing::info!("✅ Doorbell started successfully");
        Ok(())
    }

    pub async fn stop(&mut self) {
        if self.state == DoorbellState::Stopped {
            return;
        }

        tracing::info!("Stopping doorbell...");
        self.state = DoorbellState::Stopping;

        // 反向順序關閉子系統
        self.stop_camera().await;

        self.state = DoorbellState::Stopped;
        self.started_at = None;
        tracing::info!("✅ Doorbell stopped");
    }

    fn warn_unsupported_subsystems(&self) {
        if self.config.button.enabled {
            tracing::warn!(
                "Button input on GPIO {} is enabled but not supported yet, ignoring",
                self.config.button.gpio_pin
            );
        }
        if self.config.matter.enabled {
            tracing::warn!("Matter integration is enabled but not supported yet, ignoring");
        }
        if self.config.substream.enabled {
            tracing::warn!("Substream is enabled but not supported yet, ignoring");
        }
    }

    async fn start_camera(&mut self) -> Result<()> {
        tracing::info!("Starting camera streamer...");

        let settings = StreamSettings::from_config(&self.config);
        let mut streamer = CameraStreamer::new(settings, self.config.rtsp.launch_command.clone());
        streamer.start().await?;

        self.camera = Some(streamer);
        tracing::info!("✅ Camera streamer started");
        Ok(())
    }

    async fn stop_camera(&mut self) {
        if let Some(mut streamer) = self.camera.take() {
            tracing::info!("Stopping camera streamer...");
            streamer.stop().await;
            tracing::info!("✅ Camera streamer stopped");
        }
    }

    pub fn status(&mut self) -> DoorbellStatus {
        let (streaming, stats) = match self.camera.as_mut() {
            Some(streamer) => (streamer.is_streaming(), streamer.stats()),
            None => (false, None),
        };

        DoorbellStatus {
            state: self.state,
            uptime_seconds: self.started_at.map(|t| t.elapsed().as_secs()).unwrap_or(0),
            camera: CameraStatus { streaming, stats },
            audio: AudioStatus {
                enabled: self.config.audio.enabled,
                capturing: false,
            },
            button: ButtonStatus {
                enabled: self.config.button.enabled,
                last_press: None,
            },
            matter: MatterStatus {
                enabled: self.config.matter.enabled,
                commissioned: false,
            },
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn status_json(&mut self) -> Result<String> {
        Ok(serde_json::to_string(&self.status())?)
    }

    /// 啟動後每秒檢查一次，直到收到關閉訊號或串流異常結束
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> Result<()> {
        self.start().await?;

        tracing::info!("{}", "=".repeat(60));
        tracing::info!("Doorbell service is running");
        tracing::info!("Stream: {}", self.config.rtsp_url());
        tracing::info!("{}", "=".repeat(60));

        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(TICK_INTERVAL);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    if self.state != DoorbellState::Running {
                        break Ok(());
                    }

                    let streaming = self
                        .camera
                        .as_mut()
                        .map(CameraStreamer::is_streaming)
                        .unwrap_or(false);
                    if !streaming {
                        self.state = DoorbellState::Error;
                        break Err(DoorbellError::StreamError {
                            message: "streaming pipeline exited unexpectedly".to_string(),
                        });
                    }

                    if tracing::enabled!(Level::DEBUG) {
                        if let Some(monitor) = &self.monitor {
                            monitor.log_stats("doorbell");
                        }
                        match self.status_json() {
                            Ok(json) => tracing::debug!("Status: {}", json),
                            Err(e) => tracing::debug!("Status unavailable: {}", e),
                        }
                    }
                }
            }
        };

        if let Err(e) = &result {
            tracing::error!("Error in main loop: {}", e);
        }
        self.stop().await;
        result
    }
}
