use crate::core::pipeline::PipelineCheck;
use crate::utils::error::{DoorbellError, Result};
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

pub const CHECK_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub description: &'static str,
    pub passed: bool,
    pub optional: bool,
    pub detail: String,
}

/// 執行一條有限 pipeline：時間內正常結束或仍在跑都算通過
pub async fn run_check(
    launch_command: &[String],
    check: &PipelineCheck,
    limit: Duration,
) -> Result<CheckResult> {
    let (program, args) = launch_command
        .split_first()
        .ok_or_else(|| DoorbellError::MissingConfigError {
            field: "rtsp.launch_command".to_string(),
        })?;

    tracing::info!("Testing: {}", check.description);
    tracing::debug!("Pipeline: {}", check.pipeline);

    let mut child = Command::new(program)
        .args(args)
        .arg(&check.pipeline)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DoorbellError::SpawnError {
            program: program.clone(),
            source,
        })?;

    // 邊跑邊讀 stderr，避免 pipe 塞滿卡住 gst-launch
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text).await;
            text
        })
    });

    let (passed, detail) = match tokio::time::timeout(limit, child.wait()).await {
        Ok(Ok(status)) if status.success() => (true, "pipeline finished cleanly".to_string()),
        Ok(Ok(status)) => {
            let stderr = match stderr_reader {
                Some(reader) => reader.await.unwrap_or_default(),
                None => String::new(),
            };
            let reason = stderr
                .lines()
                .find(|l| l.starts_with("ERROR"))
                .unwrap_or("pipeline failed")
                .to_string();
            (false, format!("{} ({})", reason, status))
        }
        Ok(Err(e)) => (false, format!("could not wait for pipeline: {}", e)),
        Err(_) => {
            child.kill().await?;
            (true, format!("pipeline ran for {}s", limit.as_secs()))
        }
    };

    Ok(CheckResult {
        description: check.description,
        passed,
        optional: check.optional,
        detail,
    })
}

/// 必要的檢查都通過才算成功
pub fn all_required_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.passed || r.optional)
}

pub fn print_summary<W: Write>(results: &[CheckResult], out: &mut W) -> Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "TEST SUMMARY")?;
    writeln!(out, "{}", "=".repeat(60))?;
    for result in results {
        let verdict = match (result.passed, result.optional) {
            (true, _) => "✓ PASS".to_string(),
            (false, true) => format!("✗ FAIL (optional: {})", result.detail),
            (false, false) => format!("✗ FAIL ({})", result.detail),
        };
        writeln!(out, "{:<26}{}", format!("{}:", result.description), verdict)?;
    }
    writeln!(out, "{}", "=".repeat(60))?;

    if all_required_passed(results) {
        writeln!(out, "✓ GStreamer is working correctly!")?;
    } else {
        writeln!(out, "✗ Some tests failed. Check GStreamer installation.")?;
    }
    Ok(())
}
