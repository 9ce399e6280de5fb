//! Restarts the doorbell service, waits for it to settle and prints its
//! status. Takes no arguments.

use smart_doorbell::adapters::{SystemCommandRunner, Systemctl};
use smart_doorbell::utils::logger;
use smart_doorbell::{DoorbellConfig, RestartTrigger};

#[tokio::main]
async fn main() {
    logger::init_cli_logger(false);

    let config = DoorbellConfig::load_for_ops().unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration ({}), using defaults", e);
        DoorbellConfig::default()
    });

    let trigger = RestartTrigger::new(
        Systemctl::new(SystemCommandRunner, config.ops.use_sudo),
        &config,
    );

    let exit_code = trigger
        .run(&mut std::io::stdout(), &mut std::io::stderr())
        .await;

    std::process::exit(exit_code);
}
