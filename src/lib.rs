pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{DoorbellConfig, ServiceArgs};
pub use core::{
    manager::DoorbellManager, restart::RestartTrigger, status_report::StatusReporter,
    streamer::CameraStreamer,
};
pub use utils::error::{DoorbellError, Result};
