//! Two-way audio helpers: ALSA device discovery, capture and playback through
//! `arecord`/`aplay`, bounded chunk queues and level metering.

use crate::domain::ports::CommandRunner;
use crate::utils::error::{DoorbellError, Result};
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TrySendError};

pub const SAMPLE_RATE: u32 = 16_000;
pub const CHANNELS: u16 = 1;
pub const CHUNK_SAMPLES: usize = 1024;
pub const BYTES_PER_SAMPLE: usize = 2;
pub const CHUNK_BYTES: usize = CHUNK_SAMPLES * BYTES_PER_SAMPLE;
pub const QUEUE_CAPACITY: usize = 100;
pub const LEVEL_BAR_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub card: u32,
    pub device: u32,
    pub name: String,
    pub description: String,
    pub is_input: bool,
}

impl AudioDevice {
    pub fn hw_id(&self) -> String {
        format!("hw:{},{}", self.card, self.device)
    }
}

/// 解析 `arecord -l` / `aplay -l` 的輸出
pub fn parse_alsa_devices(listing: &str, is_input: bool) -> Vec<AudioDevice> {
    let re = match Regex::new(r"^card (\d+): [^\[]*\[([^\]]*)\], device (\d+): [^\[]*\[([^\]]*)\]") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    listing
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(AudioDevice {
                card: caps[1].parse().ok()?,
                name: caps[2].to_string(),
                device: caps[3].parse().ok()?,
                description: caps[4].to_string(),
                is_input,
            })
        })
        .collect()
}

pub async fn list_devices<R: CommandRunner>(runner: &R) -> Result<Vec<AudioDevice>> {
    let capture = runner.run("arecord", &["-l".to_string()]).await;
    let playback = runner.run("aplay", &["-l".to_string()]).await;

    if !capture.success() && !playback.success() {
        return Err(DoorbellError::AudioError {
            message: format!(
                "could not list audio devices: {}{}",
                capture.stderr.trim(),
                playback.stderr.trim()
            ),
        });
    }

    let mut devices = parse_alsa_devices(&capture.stdout, true);
    devices.extend(parse_alsa_devices(&playback.stdout, false));
    Ok(devices)
}

/// 16-bit little-endian PCM 的 RMS
pub fn rms_level(pcm: &[u8]) -> f64 {
    let samples: Vec<f64> = pcm
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| f64::from(i16::from_le_bytes([b[0], b[1]])))
        .collect();

    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f64).sqrt()
}

pub fn level_bar(rms: f64) -> String {
    let level = ((rms / 32768.0) * LEVEL_BAR_WIDTH as f64) as usize;
    let level = level.min(LEVEL_BAR_WIDTH);
    format!(
        "Level: [{}{}] {:6.0}",
        "=".repeat(level),
        " ".repeat(LEVEL_BAR_WIDTH - level),
        rms
    )
}

/// 滿了就丟棄並警告的音訊佇列
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Vec<u8>>,
    label: &'static str,
}

impl ChunkSender {
    pub fn push(&self, chunk: Vec<u8>) -> bool {
        match self.tx.try_send(chunk) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("{} queue full, dropping audio", self.label);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

pub struct ChunkReceiver {
    rx: mpsc::Receiver<Vec<u8>>,
    closed: bool,
}

impl ChunkReceiver {
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(chunk)) => Some(chunk),
            Ok(None) => {
                self.closed = true;
                None
            }
            Err(_) => None,
        }
    }

    /// 所有 sender 都已結束且佇列已清空
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

pub fn chunk_queue(capacity: usize, label: &'static str) -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChunkSender { tx, label }, ChunkReceiver { rx, closed: false })
}

fn pcm_args(device: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-q".to_string(),
        "-t".to_string(),
        "raw".to_string(),
        "-f".to_string(),
        "S16_LE".to_string(),
        "-r".to_string(),
        SAMPLE_RATE.to_string(),
        "-c".to_string(),
        CHANNELS.to_string(),
    ];
    if let Some(device) = device {
        args.push("-D".to_string());
        args.push(device.to_string());
    }
    args
}

/// 麥克風擷取與喇叭播放
pub struct AudioManager {
    input_device: Option<String>,
    output_device: Option<String>,
    capture: Option<Child>,
    captured: Option<ChunkReceiver>,
    playback: Option<Child>,
    playback_queue: Option<ChunkSender>,
}

impl AudioManager {
    pub fn new(input_device: Option<String>, output_device: Option<String>) -> Self {
        tracing::info!("Audio manager initialized");
        tracing::info!("Microphone: device {}", input_device.as_deref().unwrap_or("default"));
        tracing::info!("Speaker: device {}", output_device.as_deref().unwrap_or("default"));

        Self {
            input_device,
            output_device,
            capture: None,
            captured: None,
            playback: None,
            playback_queue: None,
        }
    }

    pub fn capture_args(&self) -> Vec<String> {
        pcm_args(self.input_device.as_deref())
    }

    pub fn playback_args(&self) -> Vec<String> {
        pcm_args(self.output_device.as_deref())
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn start_capture(&mut self) -> Result<()> {
        let args = self.capture_args();
        self.spawn_capture("arecord", &args)
    }

    pub(crate) fn spawn_capture(&mut self, program: &str, args: &[String]) -> Result<()> {
        if self.capture.is_some() {
            tracing::warn!("Already capturing audio");
            return Ok(());
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DoorbellError::SpawnError {
                program: program.to_string(),
                source,
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| DoorbellError::AudioError {
            message: "capture process has no stdout".to_string(),
        })?;

        let (tx, rx) = chunk_queue(QUEUE_CAPACITY, "Audio");
        tokio::spawn(async move {
            tracing::debug!("Capture loop started");
            let mut chunk = vec![0u8; CHUNK_BYTES];
            while stdout.read_exact(&mut chunk).await.is_ok() {
                tx.push(chunk.clone());
            }
            tracing::debug!("Capture loop stopped");
        });

        self.capture = Some(child);
        self.captured = Some(rx);
        tracing::info!("Audio capture started");
        Ok(())
    }

    pub async fn get_audio(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        self.captured.as_mut()?.recv_timeout(timeout).await
    }

    /// 擷取程序已結束，不會再有新資料
    pub fn capture_ended(&self) -> bool {
        self.captured.as_ref().map(ChunkReceiver::is_closed).unwrap_or(true)
    }

    pub async fn stop_capture(&mut self) {
        let Some(mut child) = self.capture.take() else {
            return;
        };

        tracing::info!("Stopping audio capture...");
        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to stop capture process: {}", e);
        }
        self.captured = None;
        tracing::info!("Audio capture stopped");
    }

    pub fn start_playback(&mut self) -> Result<()> {
        if self.playback.is_some() {
            tracing::warn!("Already playing audio");
            return Ok(());
        }

        let args = self.playback_args();
        let mut child = Command::new("aplay")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DoorbellError::SpawnError {
                program: "aplay".to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| DoorbellError::AudioError {
            message: "playback process has no stdin".to_string(),
        })?;

        let (tx, mut rx) = chunk_queue(QUEUE_CAPACITY, "Playback");
        tokio::spawn(async move {
            tracing::debug!("Playback loop started");
            while let Some(chunk) = rx.rx.recv().await {
                if let Err(e) = stdin.write_all(&chunk).await {
                    tracing::error!("Error in playback loop: {}", e);
                    break;
                }
            }
            tracing::debug!("Playback loop stopped");
        });

        self.playback = Some(child);
        self.playback_queue = Some(tx);
        tracing::info!("Audio playback started");
        Ok(())
    }

    /// 排入播放佇列；佇列滿時丟棄
    pub fn queue_audio(&self, chunk: Vec<u8>) -> bool {
        match &self.playback_queue {
            Some(queue) => queue.push(chunk),
            None => false,
        }
    }

    pub async fn stop_playback(&mut self) {
        let Some(mut child) = self.playback.take() else {
            return;
        };

        tracing::info!("Stopping audio playback...");
        self.playback_queue = None;
        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to stop playback process: {}", e);
        }
        tracing::info!("Audio playback stopped");
    }

    pub async fn cleanup(&mut self) {
        tracing::info!("Cleaning up audio manager...");
        self.stop_capture().await;
        self.stop_playback().await;
        tracing::info!("Audio manager cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CommandOutcome;
    use async_trait::async_trait;

    const ARECORD_LISTING: &str = "\
**** List of CAPTURE Hardware Devices ****
card 1: Device [USB Audio Device], device 0: USB Audio [USB Audio]
  Subdevices: 1/1
  Subdevice #0: subdevice #0
";

    const APLAY_LISTING: &str = "\
**** List of PLAYBACK Hardware Devices ****
card 0: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]
  Subdevices: 8/8
card 1: Device [USB Audio Device], device 0: USB Audio [USB Audio]
  Subdevices: 1/1
";

    struct ListingRunner {
        capture_ok: bool,
    }

    #[async_trait]
    impl CommandRunner for ListingRunner {
        async fn run(&self, program: &str, _args: &[String]) -> CommandOutcome {
            let (exit_code, stdout) = match program {
                "arecord" if self.capture_ok => (0, ARECORD_LISTING),
                "arecord" => (1, ""),
                _ => (0, APLAY_LISTING),
            };
            CommandOutcome {
                command: format!("{} -l", program),
                exit_code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }
    }

    #[test]
    fn test_parse_alsa_devices() {
        let devices = parse_alsa_devices(APLAY_LISTING, false);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "bcm2835 Headphones");
        assert_eq!(devices[0].hw_id(), "hw:0,0");
        assert_eq!(devices[1].description, "USB Audio");
        assert!(!devices[1].is_input);
    }

    #[tokio::test]
    async fn test_list_devices_merges_inputs_and_outputs() {
        let devices = list_devices(&ListingRunner { capture_ok: true }).await.unwrap();
        assert_eq!(devices.iter().filter(|d| d.is_input).count(), 1);
        assert_eq!(devices.iter().filter(|d| !d.is_input).count(), 2);

        // 沒有麥克風時仍列出喇叭
        let devices = list_devices(&ListingRunner { capture_ok: false }).await.unwrap();
        assert!(devices.iter().all(|d| !d.is_input));
    }

    #[test]
    fn test_rms_level() {
        assert_eq!(rms_level(&[]), 0.0);

        let silence = vec![0u8; CHUNK_BYTES];
        assert_eq!(rms_level(&silence), 0.0);

        let loud: Vec<u8> = [1000i16, -1000, 1000, -1000]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        assert!((rms_level(&loud) - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_level_bar() {
        let bar = level_bar(16384.0);
        assert!(bar.starts_with("Level: ["));
        assert_eq!(bar.matches('=').count(), 25);

        // 超出範圍時不會超過寬度
        let full = level_bar(40000.0);
        assert_eq!(full.matches('=').count(), LEVEL_BAR_WIDTH);
    }

    #[tokio::test]
    async fn test_chunk_queue_drops_when_full() {
        let (tx, mut rx) = chunk_queue(2, "Test");

        assert!(tx.push(vec![1]));
        assert!(tx.push(vec![2]));
        assert!(!tx.push(vec![3]));

        assert_eq!(rx.recv_timeout(Duration::from_millis(50)).await, Some(vec![1]));
        assert_eq!(rx.recv_timeout(Duration::from_millis(50)).await, Some(vec![2]));
        assert_eq!(rx.recv_timeout(Duration::from_millis(50)).await, None);
        assert!(!rx.is_closed());

        drop(tx);
        assert_eq!(rx.recv_timeout(Duration::from_millis(50)).await, None);
        assert!(rx.is_closed());
    }

    #[test]
    fn test_pcm_args() {
        let manager = AudioManager::new(Some("hw:1,0".to_string()), None);

        let capture = manager.capture_args();
        assert!(capture.windows(2).any(|w| w == ["-r", "16000"]));
        assert!(capture.ends_with(&["-D".to_string(), "hw:1,0".to_string()]));
        assert!(!manager.playback_args().contains(&"-D".to_string()));
    }

    #[tokio::test]
    async fn test_capture_reads_whole_chunks() {
        let mut manager = AudioManager::new(None, None);
        let args = vec![
            "-c".to_string(),
            format!("head -c {} /dev/zero", CHUNK_BYTES * 2),
        ];
        manager.spawn_capture("sh", &args).unwrap();
        assert!(manager.is_capturing());

        let first = manager.get_audio(Duration::from_secs(2)).await.unwrap();
        let second = manager.get_audio(Duration::from_secs(2)).await.unwrap();
        assert_eq!(first.len(), CHUNK_BYTES);
        assert_eq!(second.len(), CHUNK_BYTES);
        assert!(manager.get_audio(Duration::from_millis(200)).await.is_none());
        assert!(manager.capture_ended());

        manager.cleanup().await;
        assert!(!manager.is_capturing());
    }
}
