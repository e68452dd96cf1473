// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scripted in-memory gateway for inspector tests.
//!
//! A script is a list of [`Tick`]s, one per polling interval. Tests run on
//! tokio's paused clock, so the inspector's 500 ms cadence maps each poll
//! onto exactly one tick; cursor tests without a poll loop advance ticks
//! manually. Within one tick every query sees the same gateway state.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use strato_inspect::AdminGateway;
use strato_rest_client::{
    ApplicationDescription, DeploymentEvent, DeploymentEvents, DeploymentState,
    InstallApplicationRequest, InstallApplicationResponse, InstallServiceRequest,
    InstallServiceResponse, RestClientError, Result, ServiceDescription,
    UninstallApplicationResponse, UninstallServiceResponse,
};

pub const APPLICATION: &str = "petclinic";
pub const DEPLOYMENT_ID: &str = "dep-1";

const POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// What the gateway reports during one polling interval.
#[derive(Debug, Clone)]
pub struct Tick {
    /// Events newly published at this tick.
    pub events: Vec<&'static str>,
    /// Per-service instance counts (missing services count 0).
    pub instances: BTreeMap<&'static str, u32>,
    /// Services whose description answers 404 during this tick.
    pub gone: BTreeSet<&'static str>,
    /// Deployment state reported for services and the application.
    pub state: DeploymentState,
    /// Fail the events query at this tick with a connection error.
    pub fail_events: bool,
}

impl Default for Tick {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            instances: BTreeMap::new(),
            gone: BTreeSet::new(),
            state: DeploymentState::InProgress,
            fail_events: false,
        }
    }
}

impl Tick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: &[&'static str]) -> Self {
        self.events = events.to_vec();
        self
    }

    pub fn with_instances(mut self, pairs: &[(&'static str, u32)]) -> Self {
        self.instances = pairs.iter().copied().collect();
        self
    }

    pub fn with_gone(mut self, service_names: &[&'static str]) -> Self {
        self.gone = service_names.iter().copied().collect();
        self
    }

    pub fn with_state(mut self, state: DeploymentState) -> Self {
        self.state = state;
        self
    }

    pub fn failing_events(mut self) -> Self {
        self.fail_events = true;
        self
    }
}

struct EventLog {
    events: Vec<DeploymentEvent>,
    ticks_materialized: usize,
}

pub struct FakeGateway {
    started: Instant,
    manual_ticks: AtomicUsize,
    ticks: Vec<Tick>,
    planned: BTreeMap<&'static str, u32>,
    log: Mutex<EventLog>,
    events_calls: AtomicUsize,
    description_calls: Mutex<BTreeMap<String, usize>>,
}

impl FakeGateway {
    /// Gateway scripted by `ticks`; `planned` feeds the descriptions'
    /// planned-instances field.
    pub fn new(planned: &[(&'static str, u32)], ticks: Vec<Tick>) -> Self {
        assert!(!ticks.is_empty(), "a script needs at least one tick");
        Self {
            started: Instant::now(),
            manual_ticks: AtomicUsize::new(0),
            ticks,
            planned: planned.iter().copied().collect(),
            log: Mutex::new(EventLog {
                events: Vec::new(),
                ticks_materialized: 0,
            }),
            events_calls: AtomicUsize::new(0),
            description_calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed events that exist before polling starts (e.g. install history
    /// an uninstall must skip over).
    pub fn with_seed_events(self, descriptions: &[&str]) -> Self {
        {
            let mut log = self.log.lock().unwrap();
            for description in descriptions {
                let index = log.events.len() as u64 + 1;
                log.events
                    .push(DeploymentEvent::new(description.to_string(), index));
            }
        }
        self
    }

    /// Advance the script by one tick without sleeping (for tests that do
    /// not run a poll loop).
    pub fn advance_tick(&self) {
        self.manual_ticks.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of event-batch queries the gateway has answered (failed ones
    /// included): the number of poll ticks the inspector has run.
    pub fn events_calls(&self) -> usize {
        self.events_calls.load(Ordering::SeqCst)
    }

    /// Number of description queries for one service.
    pub fn description_queries(&self, service_name: &str) -> usize {
        *self
            .description_calls
            .lock()
            .unwrap()
            .get(service_name)
            .unwrap_or(&0)
    }

    fn current_tick(&self) -> usize {
        let timed = (self.started.elapsed().as_millis() / POLLING_INTERVAL.as_millis()) as usize;
        (timed + self.manual_ticks.load(Ordering::SeqCst)).min(self.ticks.len() - 1)
    }

    fn service_gone(&self, tick_index: usize, service_name: &str) -> bool {
        self.ticks[tick_index].gone.contains(service_name)
    }

    fn materialize(&self, through_tick: usize, log: &mut EventLog) {
        while log.ticks_materialized <= through_tick {
            let tick = &self.ticks[log.ticks_materialized];
            for description in &tick.events {
                let index = log.events.len() as u64 + 1;
                log.events.push(DeploymentEvent::new(*description, index));
            }
            log.ticks_materialized += 1;
        }
    }

    fn describe(&self, tick: &Tick, service_name: &str) -> ServiceDescription {
        ServiceDescription {
            service_name: service_name.to_string(),
            application_name: APPLICATION.to_string(),
            deployment_id: DEPLOYMENT_ID.to_string(),
            instance_count: tick.instances.get(service_name).copied().unwrap_or(0),
            planned_instances: self.planned.get(service_name).copied().unwrap_or(0),
            service_state: tick.state,
        }
    }

    fn not_found() -> RestClientError {
        RestClientError::Response {
            status: 404,
            message: "resource not found".to_string(),
            verbose: String::new(),
        }
    }
}

#[async_trait]
impl AdminGateway for FakeGateway {
    async fn deployment_events(
        &self,
        _deployment_id: &str,
        from_index: u64,
    ) -> Result<DeploymentEvents> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);

        let tick_index = self.current_tick();
        if self.ticks[tick_index].fail_events {
            return Err(RestClientError::Connection(
                "gateway unreachable".to_string(),
            ));
        }

        let mut log = self.log.lock().unwrap();
        self.materialize(tick_index, &mut log);

        let mut batch = DeploymentEvents::new();
        for event in log.events.iter().filter(|event| event.index >= from_index) {
            batch.push(event.clone());
        }
        Ok(batch)
    }

    async fn last_deployment_event(&self, _deployment_id: &str) -> Result<DeploymentEvents> {
        let tick_index = self.current_tick();
        let mut log = self.log.lock().unwrap();
        self.materialize(tick_index, &mut log);

        let mut batch = DeploymentEvents::new();
        if let Some(last) = log.events.last() {
            batch.push(last.clone());
        }
        Ok(batch)
    }

    async fn service_description(
        &self,
        _application_name: &str,
        service_name: &str,
    ) -> Result<ServiceDescription> {
        *self
            .description_calls
            .lock()
            .unwrap()
            .entry(service_name.to_string())
            .or_insert(0) += 1;

        let tick_index = self.current_tick();
        if self.service_gone(tick_index, service_name) {
            return Err(Self::not_found());
        }
        Ok(self.describe(&self.ticks[tick_index], service_name))
    }

    async fn application_description(
        &self,
        _application_name: &str,
    ) -> Result<ApplicationDescription> {
        let tick_index = self.current_tick();
        let tick = &self.ticks[tick_index];
        let services = self
            .planned
            .keys()
            .filter(|service_name| !self.service_gone(tick_index, service_name))
            .map(|service_name| self.describe(tick, service_name))
            .collect();

        Ok(ApplicationDescription {
            application_name: APPLICATION.to_string(),
            application_state: tick.state,
            services,
        })
    }

    async fn install_service(
        &self,
        _application_name: &str,
        _service_name: &str,
        _request: &InstallServiceRequest,
    ) -> Result<InstallServiceResponse> {
        Ok(InstallServiceResponse {
            deployment_id: DEPLOYMENT_ID.to_string(),
        })
    }

    async fn install_application(
        &self,
        _application_name: &str,
        _request: &InstallApplicationRequest,
    ) -> Result<InstallApplicationResponse> {
        Ok(InstallApplicationResponse {
            deployment_id: DEPLOYMENT_ID.to_string(),
        })
    }

    async fn uninstall_service(
        &self,
        _application_name: &str,
        _service_name: &str,
        _timeout_minutes: u32,
    ) -> Result<UninstallServiceResponse> {
        Ok(UninstallServiceResponse {
            deployment_id: DEPLOYMENT_ID.to_string(),
        })
    }

    async fn uninstall_application(
        &self,
        _application_name: &str,
        _timeout_minutes: u32,
    ) -> Result<UninstallApplicationResponse> {
        Ok(UninstallApplicationResponse {
            deployment_id: DEPLOYMENT_ID.to_string(),
        })
    }
}
