use crate::core::pipeline::StreamSettings;
use crate::domain::model::StreamStats;
use crate::utils::error::{DoorbellError, Result};
use crate::utils::monitor::ProcessMonitor;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// 子程序啟動後這段時間內就結束視為啟動失敗
pub const STARTUP_GRACE: Duration = Duration::from_millis(500);
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// 以 gst-launch 子程序把相機畫面推到 MediaMTX
pub struct CameraStreamer {
    settings: StreamSettings,
    launch_command: Vec<String>,
    child: Option<Child>,
    monitor: Option<ProcessMonitor>,
    last_exit: Option<ExitStatus>,
}

impl CameraStreamer {
    pub fn new(settings: StreamSettings, launch_command: Vec<String>) -> Self {
        tracing::info!(
            "Camera streamer initialized: {}@{}fps",
            settings.resolution(),
            settings.framerate
        );
        tracing::info!("RTSP URL: {}", settings.rtsp_url);
        tracing::info!("Hardware encoding: {}", settings.hardware_encoding);

        Self {
            settings,
            launch_command,
            child: None,
            monitor: None,
            last_exit: None,
        }
    }

    pub fn rtsp_url(&self) -> &str {
        &self.settings.rtsp_url
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn last_exit(&self) -> Option<ExitStatus> {
        self.last_exit
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_streaming() {
            tracing::warn!("Stream already running");
            return Ok(());
        }

        let pipeline = self.settings.pipeline_string();
        tracing::info!("Pipeline: {}", pipeline);

        let (program, args) = self
            .launch_command
            .split_first()
            .ok_or_else(|| DoorbellError::MissingConfigError {
                field: "rtsp.launch_command".to_string(),
            })?;

        let mut child = Command::new(program)
            .args(args)
            .arg(&pipeline)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DoorbellError::SpawnError {
                program: program.clone(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr));
        }

        if let Ok(waited) = tokio::time::timeout(STARTUP_GRACE, child.wait()).await {
            let status = waited?;
            self.last_exit = Some(status);
            tracing::error!("Failed to start stream: pipeline exited with {}", status);
            return Err(DoorbellError::StreamError {
                message: format!("pipeline exited during startup ({})", status),
            });
        }

        self.monitor = child.id().map(ProcessMonitor::new);
        self.child = Some(child);
        self.last_exit = None;
        tracing::info!("Camera stream started successfully");
        Ok(())
    }

    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        self.monitor = None;
        tracing::info!("Stopping camera stream...");

        // gst-launch -e 收到 SIGINT 會送 EOS 再結束
        if let Some(pid) = child.id() {
            let interrupted = Command::new("kill")
                .args(["-INT", &pid.to_string()])
                .stdin(Stdio::null())
                .status()
                .await;
            if let Err(e) = interrupted {
                tracing::warn!("Could not interrupt pipeline {}: {}", pid, e);
            }
        }

        match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => self.last_exit = Some(status),
            Ok(Err(e)) => tracing::warn!("Error waiting for pipeline: {}", e),
            Err(_) => {
                tracing::warn!("Pipeline did not stop within {:?}, killing", STOP_TIMEOUT);
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill pipeline: {}", e);
                }
                self.last_exit = child.try_wait().ok().flatten();
            }
        }

        tracing::info!("Camera stream stopped");
    }

    /// 子程序還活著才算在串流；發現已結束就記下退出狀態
    pub fn is_streaming(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::error!("Streaming pipeline exited: {}", status);
                self.last_exit = Some(status);
                self.child = None;
                self.monitor = None;
                false
            }
            Err(e) => {
                tracing::warn!("Could not poll pipeline: {}", e);
                false
            }
        }
    }

    pub fn stats(&mut self) -> Option<StreamStats> {
        let is_running = self.is_streaming();
        self.child.as_ref()?;
        let process = self.monitor.as_ref().and_then(ProcessMonitor::get_stats);

        Some(StreamStats {
            is_running,
            rtsp_url: self.settings.rtsp_url.clone(),
            resolution: self.settings.resolution(),
            framerate: self.settings.framerate,
            bitrate: self.settings.video_bitrate,
            pid: self.pid(),
            cpu_usage: process.as_ref().map(|p| p.cpu_usage),
            memory_usage_mb: process.as_ref().map(|p| p.memory_usage_mb),
        })
    }
}

/// gst-launch 的輸出轉進 tracing
async fn forward_output<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.starts_with("ERROR") {
            tracing::error!("GStreamer: {}", line);
        } else if line.starts_with("WARNING") {
            tracing::warn!("GStreamer: {}", line);
        } else if line.contains("Got EOS") {
            tracing::info!("End of stream");
        } else {
            tracing::debug!("GStreamer: {}", line);
        }
    }
}
