//! Periodic process resource sampling

use super::builtins::{CpuUsage, MemoryUsage, ResourceFields};
use super::Monitor;
use crate::core::{MonitorError, Result};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;

/// Reads CPU and memory usage of one process and tracks deltas between
/// samples
pub struct ResourceSampler {
    system: System,
    pid: Pid,
    last_cpu_ms: u64,
    last_rss: u64,
}

impl ResourceSampler {
    /// Sampler for the running process
    pub fn current() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| MonitorError::other(e.to_string()))?;
        Ok(Self {
            system: System::new(),
            pid,
            last_cpu_ms: 0,
            last_rss: 0,
        })
    }

    /// Take one sample; `None` if the process could not be read
    pub fn sample(&mut self) -> Option<(CpuUsage, MemoryUsage)> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        let process = self.system.process(self.pid)?;

        let total_ms = process.accumulated_cpu_time();
        let rss = process.memory();
        let cpu = CpuUsage {
            total_ms,
            delta_ms: total_ms.saturating_sub(self.last_cpu_ms),
            percent: process.cpu_usage(),
        };
        let memory = MemoryUsage {
            rss,
            rss_delta: rss as i64 - self.last_rss as i64,
            virtual_memory: process.virtual_memory(),
        };

        self.last_cpu_ms = total_ms;
        self.last_rss = rss;
        Some((cpu, memory))
    }
}

impl Monitor {
    /// Start emitting `monitor.resources` every `interval`
    ///
    /// Replaces any sampler previously started for this facade's path, through
    /// this facade or another lookup of the same path. Must be called
    /// within a tokio runtime. The returned closure stops the sampler.
    pub fn resources(
        &self,
        process: impl Into<String>,
        interval: Duration,
    ) -> Result<impl Fn() + Send + Sync + 'static> {
        if interval.is_zero() {
            return Err(MonitorError::config("resources", "interval must be positive"));
        }
        let handle = Handle::try_current().map_err(|_| {
            MonitorError::config("resources", "must be called within a tokio runtime")
        })?;
        let mut sampler = ResourceSampler::current()?;
        let process = process.into();
        let monitor = self.clone();

        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some((last_cpu_usage, last_memory_usage)) = sampler.sample() {
                    monitor.emit_builtin(
                        &ResourceFields {
                            process: &process,
                            last_cpu_usage,
                            last_memory_usage,
                        },
                        None,
                    );
                }
            }
        });

        let abort = task.abort_handle();
        if let Some(previous) = self.replace_sampler(Some(abort.clone())) {
            previous.abort();
        }
        self.context().track_sampler(abort.clone());

        Ok(move || abort.abort())
    }

    /// Stop the sampler running for this facade's path, if any
    pub fn stop_resource_monitoring(&self) {
        if let Some(sampler) = self.replace_sampler(None) {
            sampler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{MockConfig, MonitorConfig, MonitorManager};

    #[test]
    fn test_sampler_reads_current_process() {
        let mut sampler = ResourceSampler::current().unwrap();
        let (cpu, memory) = sampler.sample().unwrap();
        assert!(memory.rss > 0);
        assert_eq!(cpu.delta_ms, cpu.total_ms);

        let (_, second) = sampler.sample().unwrap();
        assert_eq!(second.rss_delta, second.rss as i64 - memory.rss as i64);
    }

    #[test]
    fn test_requires_runtime() {
        let mut manager = MonitorManager::new("svc");
        manager
            .setup(MonitorConfig::default().with_mock(MockConfig::default()))
            .unwrap();
        let monitor = manager.root_monitor().unwrap();
        assert!(monitor.resources("svc", Duration::from_secs(1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_every_interval_until_stopped() {
        let mut manager = MonitorManager::new("svc");
        manager
            .setup(MonitorConfig::default().with_mock(MockConfig::default()))
            .unwrap();
        let monitor = manager.root_monitor().unwrap();

        let stop = monitor.resources("worker", Duration::from_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        stop();
        monitor.stop_resource_monitoring();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let messages = manager.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.type_tag == "monitor.resources"));
        assert_eq!(messages[0].field("process"), Some(&serde_json::json!("worker")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_is_shared_by_path() {
        let mut manager = MonitorManager::new("svc");
        manager
            .setup(MonitorConfig::default().with_mock(MockConfig::default()))
            .unwrap();

        let _first = manager.monitor("api").unwrap().resources("a", Duration::from_secs(1)).unwrap();
        let _second = manager.monitor("api").unwrap().resources("b", Duration::from_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let messages = manager.drain_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].field("process"), Some(&serde_json::json!("b")));

        manager.monitor("api").unwrap().stop_resource_monitoring();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(manager.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_samplers_on_different_paths_are_independent() {
        let mut manager = MonitorManager::new("svc");
        manager
            .setup(MonitorConfig::default().with_mock(MockConfig::default()))
            .unwrap();

        let _api = manager.monitor("api").unwrap().resources("api", Duration::from_secs(1)).unwrap();
        let _web = manager.monitor("web").unwrap().resources("web", Duration::from_secs(1)).unwrap();
        manager.monitor("web").unwrap().stop_resource_monitoring();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let messages = manager.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.field("process") == Some(&serde_json::json!("api"))));
    }
}
