use serde::Serialize;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, ProcessesToUpdate, RefreshKind, System};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub pid: u32,
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
}

/// 追蹤單一程序 (本服務或 GStreamer 子程序) 的資源使用量
pub struct ProcessMonitor {
    system: Arc<Mutex<System>>,
    pid: Pid,
    peak_memory: Arc<Mutex<u64>>,
}

impl ProcessMonitor {
    pub fn new(pid: u32) -> Self {
        let mut system = System::new_with_specifics(RefreshKind::nothing());
        system.refresh_memory();

        Self {
            system: Arc::new(Mutex::new(system)),
            pid: Pid::from_u32(pid),
            peak_memory: Arc::new(Mutex::new(0)),
        }
    }

    pub fn current_process() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        Some(Self::new(pid.as_u32()))
    }

    pub fn get_stats(&self) -> Option<ProcessStats> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = system.process(self.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory > 0 {
            (memory_mb as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(ProcessStats {
            pid: self.pid.as_u32(),
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: *peak,
        })
    }

    pub fn log_stats(&self, label: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::debug!(
                "📊 {} - pid {} CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB",
                label,
                stats.pid,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.memory_usage_percent,
                stats.peak_memory_mb
            );
        }
    }
}

/// 主機名稱；查不到時退回 `localhost`
pub fn host_name() -> String {
    System::host_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
