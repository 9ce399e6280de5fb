use anyhow::Context;
use clap::{Parser, Subcommand};
use smart_doorbell::adapters::SystemCommandRunner;
use smart_doorbell::core::audio::{self, AudioManager};
use smart_doorbell::core::diagnostics::{self, CHECK_DURATION};
use smart_doorbell::core::pipeline::camera_checks;
use smart_doorbell::utils::logger;
use smart_doorbell::DoorbellConfig;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "doorbell-diag")]
#[command(about = "Hardware checks for the doorbell camera and audio")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: DiagCommand,
}

#[derive(Subcommand)]
enum DiagCommand {
    /// Run GStreamer camera, test pattern and encoder checks
    Camera,
    /// Audio device checks
    Audio {
        #[command(subcommand)]
        test: AudioTest,
    },
}

#[derive(Subcommand)]
enum AudioTest {
    /// List capture and playback devices
    Devices,
    /// Capture from the microphone and show levels
    Levels,
    /// Play the microphone back through the speaker
    Loopback,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match &args.config {
        Some(path) => DoorbellConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => DoorbellConfig::default(),
    };

    let exit_code = match args.command {
        DiagCommand::Camera => camera(&config).await?,
        DiagCommand::Audio { test } => {
            let device = config.audio.device.clone();
            let mut manager = AudioManager::new(device.clone(), device);
            let result = match test {
                AudioTest::Devices => devices().await,
                AudioTest::Levels => levels(&mut manager).await,
                AudioTest::Loopback => loopback(&mut manager).await,
            };
            manager.cleanup().await;
            result?
        }
    };

    std::process::exit(exit_code);
}

async fn camera(config: &DoorbellConfig) -> anyhow::Result<i32> {
    println!("{}", "=".repeat(60));
    println!("GStreamer Camera Test");
    println!("{}", "=".repeat(60));

    let mut results = Vec::new();
    for check in camera_checks(&config.video.device) {
        let result = diagnostics::run_check(&config.rtsp.launch_command, &check, CHECK_DURATION)
            .await
            .with_context(|| format!("Could not run check '{}'", check.description))?;
        results.push(result);
    }

    let mut out = std::io::stdout();
    diagnostics::print_summary(&results, &mut out)?;
    Ok(if diagnostics::all_required_passed(&results) { 0 } else { 1 })
}

async fn devices() -> anyhow::Result<i32> {
    let devices = audio::list_devices(&SystemCommandRunner).await?;

    println!("{}", "=".repeat(60));
    println!("AUDIO DEVICES");
    println!("{}", "=".repeat(60));

    println!("\nInput Devices (Microphones):");
    for d in devices.iter().filter(|d| d.is_input) {
        println!("  [{}] {} - {}", d.hw_id(), d.name, d.description);
    }

    println!("\nOutput Devices (Speakers):");
    for d in devices.iter().filter(|d| !d.is_input) {
        println!("  [{}] {} - {}", d.hw_id(), d.name, d.description);
    }

    println!("{}", "=".repeat(60));
    Ok(0)
}

async fn levels(manager: &mut AudioManager) -> anyhow::Result<i32> {
    manager.start_capture()?;
    println!("Capturing audio and showing levels... Press Ctrl+C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut out = std::io::stdout();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            chunk = manager.get_audio(Duration::from_millis(100)) => {
                if let Some(chunk) = chunk {
                    write!(out, "\r{}", audio::level_bar(audio::rms_level(&chunk)))?;
                    out.flush()?;
                } else if manager.capture_ended() {
                    break;
                }
            }
        }
    }

    println!("\n\nStopping capture...");
    Ok(0)
}

async fn loopback(manager: &mut AudioManager) -> anyhow::Result<i32> {
    manager.start_capture()?;
    manager.start_playback()?;
    println!("Capturing from microphone and playing to speaker... Press Ctrl+C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            chunk = manager.get_audio(Duration::from_millis(100)) => {
                if let Some(chunk) = chunk {
                    manager.queue_audio(chunk);
                } else if manager.capture_ended() {
                    break;
                }
            }
        }
    }

    println!("\nStopping loopback...");
    Ok(0)
}
