//! Prints the doorbell and MediaMTX service status, recent doorbell logs and
//! a command for testing the stream. Takes no arguments.

use smart_doorbell::adapters::{Journalctl, SystemCommandRunner, SystemHostResolver, Systemctl};
use smart_doorbell::utils::logger;
use smart_doorbell::{DoorbellConfig, StatusReporter};

#[tokio::main]
async fn main() {
    logger::init_cli_logger(false);

    let config = DoorbellConfig::load_for_ops().unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration ({}), using defaults", e);
        DoorbellConfig::default()
    });

    let reporter = StatusReporter::new(
        Systemctl::new(SystemCommandRunner, config.ops.use_sudo),
        Journalctl::new(SystemCommandRunner),
        SystemHostResolver,
        &config,
    );

    let exit_code = reporter
        .run(&mut std::io::stdout(), &mut std::io::stderr())
        .await;

    std::process::exit(exit_code);
}
