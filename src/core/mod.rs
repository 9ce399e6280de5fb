pub mod audio;
pub mod diagnostics;
pub mod manager;
pub mod pipeline;
pub mod restart;
pub mod status_report;
pub mod streamer;

pub use crate::domain::model::{CommandOutcome, DoorbellState, DoorbellStatus};
pub use crate::domain::ports::{CommandRunner, HostResolver, LogReader, ServiceManager};
pub use crate::utils::error::Result;
