pub mod cli;
pub mod toml_config;

pub use cli::ServiceArgs;
pub use toml_config::{
    AudioConfig, ButtonConfig, DoorbellConfig, MatterConfig, OpsConfig, RtspConfig,
    SubstreamConfig, VideoConfig,
};
