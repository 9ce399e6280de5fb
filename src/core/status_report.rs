use crate::config::toml_config::DoorbellConfig;
use crate::domain::model::CommandOutcome;
use crate::domain::ports::{HostResolver, LogReader, ServiceManager};
use std::io::{self, Write};

/// 依序查詢兩個服務的狀態與最近日誌，最後印出測試串流的指令。
/// 任何一步失敗都不會中斷後續步驟。
pub struct StatusReporter<S: ServiceManager, L: LogReader, H: HostResolver> {
    services: S,
    logs: L,
    host: H,
    service_unit: String,
    relay_unit: String,
    log_lines: usize,
    rtsp_port: u16,
    stream_name: String,
}

impl<S: ServiceManager, L: LogReader, H: HostResolver> StatusReporter<S, L, H> {
    pub fn new(services: S, logs: L, host: H, config: &DoorbellConfig) -> Self {
        Self {
            services,
            logs,
            host,
            service_unit: config.ops.service_unit.clone(),
            relay_unit: config.ops.relay_unit.clone(),
            log_lines: config.ops.log_lines,
            rtsp_port: config.rtsp.port,
            stream_name: config.rtsp.stream_name.clone(),
        }
    }

    pub fn stream_test_command(&self) -> String {
        format!(
            "ffplay rtsp://{}:{}/{}",
            self.host.host_name(),
            self.rtsp_port,
            self.stream_name
        )
    }

    /// 回傳最後一個外部查詢 (日誌) 的退出碼。輸出寫不進去只記警告，查詢照跑。
    pub async fn run<O: Write, E: Write>(&self, out: &mut O, err: &mut E) -> i32 {
        emit(writeln!(out, "=== {} service ===", self.service_unit));
        let service = self.services.status(&self.service_unit).await;
        print_outcome(&service, out, err);

        emit(writeln!(out).and_then(|_| writeln!(out, "=== {} service ===", self.relay_unit)));
        let relay = self.services.status(&self.relay_unit).await;
        print_outcome(&relay, out, err);

        emit(writeln!(out).and_then(|_| writeln!(out, "=== Recent {} logs ===", self.service_unit)));
        let logs = self.logs.recent_lines(&self.service_unit, self.log_lines).await;
        print_outcome(&logs, out, err);

        emit(
            writeln!(out)
                .and_then(|_| writeln!(out, "Test the stream with:"))
                .and_then(|_| writeln!(out, "  {}", self.stream_test_command()))
                .and_then(|_| out.flush()),
        );

        tracing::debug!(
            service_exit = service.exit_code,
            relay_exit = relay.exit_code,
            logs_exit = logs.exit_code,
            "Status report finished"
        );

        logs.exit_code
    }
}

/// 原樣輸出指令的 stdout / stderr
pub fn print_outcome<O: Write, E: Write>(outcome: &CommandOutcome, out: &mut O, err: &mut E) {
    emit(out.write_all(outcome.stdout.as_bytes()).and_then(|_| out.flush()));
    emit(err.write_all(outcome.stderr.as_bytes()).and_then(|_| err.flush()));
}

pub(crate) fn emit(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::warn!("⚠️ Could not write output: {}", e);
    }
}
