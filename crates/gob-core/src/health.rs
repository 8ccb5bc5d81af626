use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    process_manager::ProcessManager,
    service_manager::ServiceManager,
    types::{Exit, ServiceStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Down,
}

impl From<ServiceStatus> for HealthStatus {
    fn from(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Running => Self::Healthy,
            ServiceStatus::Stopped | ServiceStatus::NotFound => Self::Down,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Down => "down",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthEntry {
    pub service: String,
    pub status: HealthStatus,
    /// Always `0.0`; nothing probes the service yet.
    pub response_time: f64,
    pub last_check: DateTime<Utc>,
    /// Always empty; services declare no dependencies.
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<Exit>,
}

/// Health of every known service at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HealthReport(BTreeMap<String, HealthEntry>);

impl HealthReport {
    #[must_use]
    pub fn get(&self, service: &str) -> Option<&HealthEntry> {
        self.0.get(service)
    }

    #[must_use]
    pub fn is_healthy(&self, service: &str) -> bool {
        self.get(service)
            .is_some_and(|entry| entry.status == HealthStatus::Healthy)
    }

    pub fn entries(&self) -> impl Iterator<Item = &HealthEntry> {
        self.0.values()
    }

    pub fn healthy(&self) -> impl Iterator<Item = &HealthEntry> {
        self.entries()
            .filter(|entry| entry.status == HealthStatus::Healthy)
    }

    pub fn down(&self) -> impl Iterator<Item = &HealthEntry> {
        self.entries().filter(|entry| entry.status == HealthStatus::Down)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            write!(f, "{}: {}", entry.service, entry.status)?;
            if let Some(exit) = entry.last_exit {
                write!(f, " (last {exit})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Read-only view translating service liveness into health.
#[derive(Debug)]
pub struct HealthMonitor<'a, P: ProcessManager> {
    services: &'a ServiceManager<P>,
}

impl<P: ProcessManager> Clone for HealthMonitor<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ProcessManager> Copy for HealthMonitor<'_, P> {}

impl<'a, P: ProcessManager> HealthMonitor<'a, P> {
    #[must_use]
    pub fn new(services: &'a ServiceManager<P>) -> Self {
        Self { services }
    }

    #[must_use]
    pub fn check(&self, service: &str) -> HealthEntry {
        let snapshot = self.services.snapshot(service);
        let status = snapshot
            .as_ref()
            .map_or(ServiceStatus::NotFound, |s| s.status);

        HealthEntry {
            service: service.to_owned(),
            status: status.into(),
            response_time: 0.0,
            last_check: Utc::now(),
            dependencies: Vec::new(),
            last_exit: snapshot.and_then(|s| s.last_exit),
        }
    }

    #[must_use]
    pub fn get_system_health(&self) -> HealthReport {
        HealthReport(
            self.services
                .names()
                .map(|name| (name.to_owned(), self.check(name)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use gob_types::ServiceDefinition;

    use crate::process_manager::MockProcessManager;

    use super::*;

    fn services(pm: &MockProcessManager) -> ServiceManager<MockProcessManager> {
        let definitions = BTreeMap::from([
            ("api".to_owned(), ServiceDefinition::new("run-api")),
            ("db".to_owned(), ServiceDefinition::new("run-db")),
        ]);
        ServiceManager::load(pm.clone(), &definitions)
    }

    #[test]
    fn test_never_started_is_down() {
        let pm = MockProcessManager::default();
        let services = services(&pm);
        let monitor = HealthMonitor::new(&services);

        let report = monitor.get_system_health();
        assert_eq!(report.len(), 2);
        assert_eq!(report.down().count(), 2);
        assert!(pm.spawned().is_empty());
    }

    #[test]
    fn test_check_maps_status() {
        let pm = MockProcessManager::default();
        let services = services(&pm);
        let monitor = HealthMonitor::new(&services);

        assert!(services.start("api"));

        let api = monitor.check("api");
        assert_eq!(api.status, HealthStatus::Healthy);
        assert_eq!(api.response_time, 0.0);
        assert!(api.dependencies.is_empty());

        assert_eq!(monitor.check("db").status, HealthStatus::Down);
        assert_eq!(monitor.check("ghost").status, HealthStatus::Down);

        let report = monitor.get_system_health();
        assert!(report.is_healthy("api"));
        assert!(!report.is_healthy("db"));
        assert!(report.get("ghost").is_none());
    }

    #[test]
    fn test_crash_shows_last_exit() {
        let pm = MockProcessManager::default();
        let services = services(&pm);
        let monitor = HealthMonitor::new(&services);

        assert!(services.start("db"));
        pm.exit(0, Exit::Code(2));

        let db = monitor.check("db");
        assert_eq!(db.status, HealthStatus::Down);
        assert_eq!(db.last_exit, Some(Exit::Code(2)));
        assert!(monitor.get_system_health().to_string().contains("db: down (last exit code 2)"));
    }

    #[test]
    fn test_report_serializes_by_name() {
        let pm = MockProcessManager::default();
        let services = services(&pm);
        assert!(services.start("api"));

        let report = HealthMonitor::new(&services).get_system_health();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["api"]["status"], "healthy");
        assert_eq!(json["api"]["service"], "api");
        assert_eq!(json["db"]["status"], "down");
        assert!(json["db"]["dependencies"].as_array().unwrap().is_empty());
        assert!(json["db"].get("last_exit").is_none());
    }
}
