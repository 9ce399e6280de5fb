use crate::domain::model::CommandOutcome;
use async_trait::async_trait;

/// 執行外部程式並收集輸出。無法啟動時回傳 exit code 127 的結果而非錯誤。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutcome;
}

#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn status(&self, unit: &str) -> CommandOutcome;
    async fn restart(&self, unit: &str) -> CommandOutcome;
}

#[async_trait]
pub trait LogReader: Send + Sync {
    async fn recent_lines(&self, unit: &str, lines: usize) -> CommandOutcome;
}

pub trait HostResolver: Send + Sync {
    fn host_name(&self) -> String;
}
