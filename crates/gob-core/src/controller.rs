use std::thread;

use gob_types::ControllerSettings;

use crate::{
    health::{HealthMonitor, HealthReport},
    process_manager::ProcessManager,
    service_manager::ServiceManager,
};

/// Sequences startup and shutdown over every configured service.
#[derive(Debug)]
pub struct Controller<'a, P: ProcessManager> {
    services: &'a ServiceManager<P>,
    health: HealthMonitor<'a, P>,
    settings: ControllerSettings,
}

impl<'a, P: ProcessManager> Controller<'a, P> {
    #[must_use]
    pub fn new(services: &'a ServiceManager<P>, settings: ControllerSettings) -> Self {
        Self {
            services,
            health: HealthMonitor::new(services),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Every configured service except the controller itself.
    fn managed(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.services
            .names()
            .filter(move |name| *name != self.settings.name)
    }

    /// Start every managed service, wait the grace period and report health.
    pub fn run(&self) -> HealthReport {
        tracing::info!("Starting all services");

        let mut started = 0;
        for name in self.managed() {
            if self.services.start(name) {
                started += 1;
            }
        }
        tracing::info!(
            "Started {started} service(s), waiting {:?} before the health check",
            self.settings.grace_period
        );

        thread::sleep(self.settings.grace_period);

        let report = self.health.get_system_health();
        tracing::info!("System health after startup:\n{report}");
        report
    }

    /// Stop every managed service and report health.
    pub fn stop_all(&self) -> HealthReport {
        tracing::info!("Stopping all services");

        for name in self.managed() {
            self.services.stop(name);
        }

        let report = self.health.get_system_health();
        tracing::info!("System health after shutdown:\n{report}");
        report
    }

    /// Open a session whose end, however it comes, stops every service.
    #[must_use]
    pub fn session(&self) -> Session<'_, 'a, P> {
        Session {
            controller: self,
            stopped: false,
        }
    }

    /// Run the services for the duration of `f`.
    ///
    /// `f` receives the startup report. Services are stopped afterwards even if
    /// `f` panics; the final report is returned next to `f`'s result.
    pub fn supervise<T>(&self, f: impl FnOnce(&HealthReport) -> T) -> (T, HealthReport) {
        let session = self.session();
        let report = session.run();
        let result = f(&report);
        (result, session.finish())
    }
}

/// Guard over a controller run. Dropping it calls [`Controller::stop_all`]
/// unless [`Session::finish`] already did.
#[derive(Debug)]
pub struct Session<'c, 'a, P: ProcessManager> {
    controller: &'c Controller<'a, P>,
    stopped: bool,
}

impl<P: ProcessManager> Session<'_, '_, P> {
    pub fn run(&self) -> HealthReport {
        self.controller.run()
    }

    /// End the session now and return the final health report.
    pub fn finish(mut self) -> HealthReport {
        self.stopped = true;
        self.controller.stop_all()
    }
}

impl<P: ProcessManager> Drop for Session<'_, '_, P> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        if thread::panicking() {
            tracing::warn!("Session ended by a panic, stopping all services");
        }
        self.stopped = true;
        self.controller.stop_all();
    }
}
