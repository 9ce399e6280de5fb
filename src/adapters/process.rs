use crate::domain::model::CommandOutcome;
use crate::domain::ports::CommandRunner;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 以 tokio 子程序執行外部指令
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutcome {
        let command = render_command(program, args);
        tracing::debug!(command = %command, "Running command");

        let result = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) => {
                // 被 signal 結束時沒有 exit code
                let exit_code = output.status.code().unwrap_or(-1);
                tracing::debug!(command = %command, exit_code, "Command finished");
                CommandOutcome {
                    command,
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(command = %command, "Failed to execute command: {e}");
                CommandOutcome::spawn_failure(command, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command() {
        let args = vec!["status".to_string(), "doorbell".to_string()];
        assert_eq!(render_command("systemctl", &args), "systemctl status doorbell");
        assert_eq!(render_command("hostname", &[]), "hostname");
    }

    #[tokio::test]
    async fn test_run_captures_output_and_exit_code() {
        let runner = SystemCommandRunner;
        let args = vec!["-c".to_string(), "echo active; exit 3".to_string()];
        let outcome = runner.run("sh", &args).await;

        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "active\n");
        assert_eq!(outcome.command, "sh -c echo active; exit 3");
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_127() {
        let runner = SystemCommandRunner;
        let outcome = runner.run("definitely-not-a-real-program-xyz", &[]).await;

        assert_eq!(outcome.exit_code, CommandOutcome::NOT_FOUND_EXIT_CODE);
        assert!(outcome.stdout.is_empty());
        assert!(!outcome.stderr.is_empty());
    }
}
