use crate::domain::model::CommandOutcome;
use crate::domain::ports::{CommandRunner, LogReader, ServiceManager};
use async_trait::async_trait;

/// systemd 服務管理 (`systemctl`)
pub struct Systemctl<R: CommandRunner> {
    runner: R,
    use_sudo: bool,
}

impl<R: CommandRunner> Systemctl<R> {
    pub fn new(runner: R, use_sudo: bool) -> Self {
        Self { runner, use_sudo }
    }
}

#[async_trait]
impl<R: CommandRunner> ServiceManager for Systemctl<R> {
    async fn status(&self, unit: &str) -> CommandOutcome {
        let args = vec!["status".to_string(), unit.to_string(), "--no-pager".to_string()];
        self.runner.run("systemctl", &args).await
    }

    async fn restart(&self, unit: &str) -> CommandOutcome {
        if self.use_sudo {
            let args = vec![
                "systemctl".to_string(),
                "restart".to_string(),
                unit.to_string(),
            ];
            self.runner.run("sudo", &args).await
        } else {
            let args = vec!["restart".to_string(), unit.to_string()];
            self.runner.run("systemctl", &args).await
        }
    }
}

/// journald 日誌 (`journalctl`)
pub struct Journalctl<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> Journalctl<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: CommandRunner> LogReader for Journalctl<R> {
    async fn recent_lines(&self, unit: &str, lines: usize) -> CommandOutcome {
        let args = vec![
            "-u".to_string(),
            unit.to_string(),
            "-n".to_string(),
            lines.to_string(),
            "--no-pager".to_string(),
        ];
        self.runner.run("journalctl", &args).await
    }
}
