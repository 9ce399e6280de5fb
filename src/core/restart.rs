use crate::config::toml_config::DoorbellConfig;
use crate::core::status_report::{emit, print_outcome};
use crate::domain::ports::ServiceManager;
use std::io::Write;
use std::time::Duration;

/// 重新啟動服務，固定等待後印出狀態。不重試、不回滾，重啟失敗也照樣往下走。
pub struct RestartTrigger<S: ServiceManager> {
    services: S,
    unit: String,
    settle_delay: Duration,
}

impl<S: ServiceManager> RestartTrigger<S> {
    pub fn new(services: S, config: &DoorbellConfig) -> Self {
        Self {
            services,
            unit: config.ops.service_unit.clone(),
            settle_delay: config.ops.settle_delay(),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// 回傳重啟後狀態查詢的退出碼
    pub async fn run<O: Write, E: Write>(&self, out: &mut O, err: &mut E) -> i32 {
        emit(writeln!(out, "Restarting {} service...", self.unit).and_then(|_| out.flush()));

        let restart = self.services.restart(&self.unit).await;
        print_outcome(&restart, out, err);
        if !restart.success() {
            tracing::warn!(
                unit = %self.unit,
                exit_code = restart.exit_code,
                "Restart request failed, checking status anyway"
            );
        }

        tokio::time::sleep(self.settle_delay).await;

        let status = self.services.status(&self.unit).await;
        print_outcome(&status, out, err);

        status.exit_code
    }
}
