//! GStreamer pipeline descriptions for the RTSP push stream and the
//! camera smoke checks.

use crate::config::toml_config::DoorbellConfig;
use crate::domain::model::{AudioSource, CameraSource};

/// rtspclientsink 緩衝 (ms)
pub const SINK_LATENCY_MS: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub video_source: CameraSource,
    pub video_device: String,
    pub audio_source: AudioSource,
    pub audio_device: Option<String>,
    pub rtsp_url: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub video_bitrate: u32,
    pub audio_bitrate: u32,
    pub hardware_encoding: bool,
}

impl StreamSettings {
    pub fn from_config(config: &DoorbellConfig) -> Self {
        Self {
            video_source: config.video.source,
            video_device: config.video.device.clone(),
            audio_source: config.effective_audio_source(),
            audio_device: config.audio.device.clone(),
            rtsp_url: config.rtsp_url(),
            width: config.video.width,
            height: config.video.height,
            framerate: config.video.framerate,
            video_bitrate: config.video.bitrate,
            audio_bitrate: config.audio.bitrate,
            hardware_encoding: config.video.hardware_encoding,
        }
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    fn video_source_element(&self) -> String {
        match self.video_source {
            CameraSource::Test => "videotestsrc is-live=true".to_string(),
            CameraSource::V4l2 => format!("v4l2src device={}", self.video_device),
            CameraSource::Libcamera => "libcamerasrc".to_string(),
        }
    }

    fn video_caps(&self) -> String {
        format!(
            "video/x-raw,width={},height={},framerate={}/1",
            self.width, self.height, self.framerate
        )
    }

    fn encoder(&self) -> String {
        if self.hardware_encoding {
            format!(
                "v4l2h264enc extra-controls=\"controls,video_bitrate={}\" ! \
                 video/x-h264,profile=baseline,level=(string)3.1",
                self.video_bitrate
            )
        } else {
            // 每 2 秒一個 keyframe，不用 B-frame 降低延遲
            format!(
                "x264enc bitrate={} speed-preset=ultrafast tune=zerolatency key-int-max={} bframes=0 ! \
                 video/x-h264,profile=baseline",
                self.video_bitrate / 1000,
                self.framerate * 2
            )
        }
    }

    fn video_branch(&self) -> String {
        format!(
            "{} ! {} ! videoconvert ! video/x-raw,format=I420 ! {} ! h264parse config-interval=-1",
            self.video_source_element(),
            self.video_caps(),
            self.encoder()
        )
    }

    fn audio_branch(&self) -> Option<String> {
        let device = self
            .audio_device
            .as_ref()
            .map(|d| format!(" device={}", d))
            .unwrap_or_default();

        let source = match self.audio_source {
            AudioSource::None => return None,
            AudioSource::Test => "audiotestsrc is-live=true wave=ticks".to_string(),
            AudioSource::Alsa => format!("alsasrc{}", device),
            AudioSource::Pulse => format!("pulsesrc{}", device),
        };

        Some(format!(
            "{} ! audioconvert ! audioresample ! opusenc bitrate={}",
            source, self.audio_bitrate
        ))
    }

    fn sink(&self) -> String {
        format!(
            "rtspclientsink location={} protocols=tcp latency={}",
            self.rtsp_url, SINK_LATENCY_MS
        )
    }

    /// gst-launch 語法的完整 pipeline
    pub fn pipeline_string(&self) -> String {
        match self.audio_branch() {
            None => format!("{} ! {}", self.video_branch(), self.sink()),
            Some(audio) => format!(
                "{} name=sink {} ! sink. {} ! sink.",
                self.sink(),
                self.video_branch(),
                audio
            ),
        }
    }
}

/// 相機 / 編碼器檢查用的有限 pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCheck {
    pub description: &'static str,
    pub pipeline: String,
    /// 失敗是否可以接受 (例如還沒接相機)
    pub optional: bool,
}

pub fn camera_checks(video_device: &str) -> Vec<PipelineCheck> {
    vec![
        PipelineCheck {
            description: "USB/V4L2 Camera",
            pipeline: format!(
                "v4l2src device={} ! video/x-raw,width=640,height=480,framerate=30/1 ! \
                 videoconvert ! fakesink",
                video_device
            ),
            optional: true,
        },
        PipelineCheck {
            description: "Test Pattern Generator",
            pipeline: "videotestsrc num-buffers=90 pattern=smpte ! \
                       video/x-raw,width=640,height=480,framerate=30/1 ! videoconvert ! fakesink"
                .to_string(),
            optional: false,
        },
        PipelineCheck {
            description: "H.264 Hardware Encoding",
            pipeline: "videotestsrc num-buffers=90 ! \
                       video/x-raw,width=1280,height=720,framerate=30/1 ! videoconvert ! \
                       v4l2h264enc ! video/x-h264,profile=baseline ! fakesink"
                .to_string(),
            optional: false,
        },
    ]
}
