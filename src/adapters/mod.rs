// Adapters layer: concrete implementations of the domain ports (process runner, systemd, host).

pub mod host;
pub mod process;
pub mod systemd;

pub use host::SystemHostResolver;
pub use process::SystemCommandRunner;
pub use systemd::{Journalctl, Systemctl};
