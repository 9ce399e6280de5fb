use crate::domain::ports::HostResolver;
use crate::utils::monitor;

#[derive(Debug, Clone, Default)]
pub struct SystemHostResolver;

impl HostResolver for SystemHostResolver {
    fn host_name(&self) -> String {
        monitor::host_name()
    }
}
