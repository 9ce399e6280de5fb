use async_trait::async_trait;
use smart_doorbell::adapters::{Journalctl, Systemctl};
use smart_doorbell::core::{CommandOutcome, CommandRunner, HostResolver};
use smart_doorbell::{DoorbellConfig, RestartTrigger, StatusReporter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 依指令回傳預設結果，並記錄呼叫順序與時間
#[derive(Clone, Default)]
struct ScriptedRunner {
    responses: Arc<HashMap<String, (i32, String, String)>>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl ScriptedRunner {
    fn new(responses: &[(&str, i32, &str, &str)]) -> Self {
        let responses = responses
            .iter()
            .map(|(cmd, code, out, err)| (cmd.to_string(), (*code, out.to_string(), err.to_string())))
            .collect();
        Self {
            responses: Arc::new(responses),
            calls: Arc::default(),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutcome {
        let command = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push((command.clone(), Instant::now()));

        match self.responses.get(&command) {
            Some((exit_code, stdout, stderr)) => CommandOutcome {
                command,
                exit_code: *exit_code,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            },
            None => CommandOutcome {
                command: command.clone(),
                exit_code: 127,
                stdout: String::new(),
                stderr: format!("{}: command not found\n", program),
            },
        }
    }
}

struct FixedHost(&'static str);

impl HostResolver for FixedHost {
    fn host_name(&self) -> String {
        self.0.to_string()
    }
}

fn reporter(runner: &ScriptedRunner) -> StatusReporter<Systemctl<ScriptedRunner>, Journalctl<ScriptedRunner>, FixedHost> {
    StatusReporter::new(
        Systemctl::new(runner.clone(), true),
        Journalctl::new(runner.clone()),
        FixedHost("raspberry-doorbell"),
        &DoorbellConfig::default(),
    )
}

#[tokio::test]
async fn test_status_report_prints_everything_verbatim() {
    let runner = ScriptedRunner::new(&[
        (
            "systemctl status doorbell --no-pager",
            0,
            "● doorbell.service - Smart Video Doorbell\n   Active: active (running)\n",
            "",
        ),
        (
            "systemctl status mediamtx --no-pager",
            0,
            "● mediamtx.service - MediaMTX\n   Active: active (running)\n",
            "",
        ),
        (
            "journalctl -u doorbell -n 20 --no-pager",
            0,
            "Oct 18 10:00:00 raspberry-doorbell doorbell[42]: Doorbell service is running\n",
            "",
        ),
    ]);

    let mut out: Vec<u8> = Vec::new();
    let mut err: Vec<u8> = Vec::new();
    let exit_code = reporter(&runner).run(&mut out, &mut err).await;
    let text = String::from_utf8(out).unwrap();

    assert_eq!(exit_code, 0);
    assert!(err.is_empty());
    assert!(text.contains("   Active: active (running)\n"));
    assert!(text.contains("● mediamtx.service - MediaMTX\n"));
    assert!(text.contains("doorbell[42]: Doorbell service is running\n"));
    assert!(text.contains("ffplay rtsp://raspberry-doorbell:8554/doorbell"));

    // doorbell 的輸出在 mediamtx 之前，日誌最後
    let doorbell_at = text.find("doorbell.service").unwrap();
    let mediamtx_at = text.find("mediamtx.service").unwrap();
    let logs_at = text.find("doorbell[42]").unwrap();
    assert!(doorbell_at < mediamtx_at && mediamtx_at < logs_at);
}

#[tokio::test]
async fn test_status_report_queries_each_service_once_regardless_of_failures() {
    // 全部失敗也要三個查詢都跑完
    let runner = ScriptedRunner::new(&[
        ("systemctl status doorbell --no-pager", 3, "   Active: failed\n", ""),
        (
            "journalctl -u doorbell -n 20 --no-pager",
            1,
            "",
            "Failed to open journal: Permission denied\n",
        ),
    ]);

    let mut out: Vec<u8> = Vec::new();
    let mut err: Vec<u8> = Vec::new();
    let exit_code = reporter(&runner).run(&mut out, &mut err).await;

    assert_eq!(
        runner.commands(),
        vec![
            "systemctl status doorbell --no-pager",
            "systemctl status mediamtx --no-pager",
            "journalctl -u doorbell -n 20 --no-pager",
        ]
    );

    // 退出碼只反映最後一個查詢
    assert_eq!(exit_code, 1);

    let err_text = String::from_utf8(err).unwrap();
    assert!(err_text.contains("systemctl: command not found"));
    assert!(err_text.contains("Permission denied"));
    assert!(String::from_utf8(out).unwrap().contains("ffplay rtsp://"));
}

#[tokio::test]
async fn test_status_report_uses_configured_units() {
    let mut config = DoorbellConfig::default();
    config.ops.service_unit = "doorbell-dev".to_string();
    config.ops.log_lines = 50;
    config.rtsp.stream_name = "front".to_string();

    let runner = ScriptedRunner::new(&[]);
    let reporter = StatusReporter::new(
        Systemctl::new(runner.clone(), true),
        Journalctl::new(runner.clone()),
        FixedHost("porch"),
        &config,
    );

    let mut out: Vec<u8> = Vec::new();
    let exit_code = reporter.run(&mut out, &mut std::io::sink()).await;

    assert_eq!(exit_code, 127);
    assert_eq!(runner.commands()[0], "systemctl status doorbell-dev --no-pager");
    assert_eq!(runner.commands()[2], "journalctl -u doorbell-dev -n 50 --no-pager");
    assert_eq!(reporter.stream_test_command(), "ffplay rtsp://porch:8554/front");
}

#[tokio::test]
async fn test_restart_then_status_after_delay() {
    let runner = ScriptedRunner::new(&[
        ("sudo systemctl restart doorbell", 0, "", ""),
        (
            "systemctl status doorbell --no-pager",
            0,
            "   Active: active (running) since Sat 2026-10-18 10:00:00 UTC; 2s ago\n",
            "",
        ),
    ]);

    let delay = Duration::from_millis(150);
    let trigger = RestartTrigger::new(Systemctl::new(runner.clone(), true), &DoorbellConfig::default())
        .with_settle_delay(delay);

    let mut out: Vec<u8> = Vec::new();
    let exit_code = trigger.run(&mut out, &mut std::io::sink()).await;

    assert_eq!(exit_code, 0);
    assert!(String::from_utf8(out).unwrap().contains("Active: active (running)"));

    let calls = runner.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "sudo systemctl restart doorbell");
    assert_eq!(calls[1].0, "systemctl status doorbell --no-pager");
    assert!(calls[1].1.duration_since(calls[0].1) >= delay);
}

#[tokio::test]
async fn test_failed_restart_still_reports_status() {
    let runner = ScriptedRunner::new(&[
        (
            "sudo systemctl restart doorbell",
            1,
            "",
            "sudo: a password is required\n",
        ),
        ("systemctl status doorbell --no-pager", 3, "   Active: inactive (dead)\n", ""),
    ]);

    let trigger = RestartTrigger::new(Systemctl::new(runner.clone(), true), &DoorbellConfig::default())
        .with_settle_delay(Duration::from_millis(10));

    let mut out: Vec<u8> = Vec::new();
    let mut err: Vec<u8> = Vec::new();
    let exit_code = trigger.run(&mut out, &mut err).await;

    assert_eq!(runner.commands().len(), 2);
    assert_eq!(exit_code, 3);
    assert!(String::from_utf8(err).unwrap().contains("a password is required"));
    assert!(String::from_utf8(out).unwrap().contains("inactive (dead)"));
}

struct ClosedPipe;

impl std::io::Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }
}

#[tokio::test]
async fn test_restart_runs_even_when_output_is_closed() {
    let runner = ScriptedRunner::new(&[
        ("sudo systemctl restart doorbell", 0, "", ""),
        ("systemctl status doorbell --no-pager", 0, "   Active: active (running)\n", ""),
    ]);

    let trigger = RestartTrigger::new(Systemctl::new(runner.clone(), true), &DoorbellConfig::default())
        .with_settle_delay(Duration::from_millis(10));

    let exit_code = trigger.run(&mut ClosedPipe, &mut ClosedPipe).await;

    assert_eq!(exit_code, 0);
    assert_eq!(
        runner.commands(),
        vec!["sudo systemctl restart doorbell", "systemctl status doorbell --no-pager"]
    );
}
