//! Test doubles and common utilities for controller contract tests
//!
//! The fakes keep remote objects in memory and count every call, so tests
//! can assert both outcomes and how many remote round-trips they took.
//! Clones share storage and counters.

#![allow(dead_code)]

use async_trait::async_trait;
use cherry_core::config::ProviderConfig;
use cherry_core::traits::{
    ApiError, ApiResult, AssignedServer, CreateIpAddress, CreateProject, IpAddress, IpClient,
    IpClientFactory, IpRegion, Logger, Project, ProjectBgp, ProjectClient, ProjectClientFactory,
    Response, RoutedTo, UpdateIpAddress, UpdateProject,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Team used by every project test
pub const TEAM_ID: i64 = 1;

/// Project used by every IP address test
pub const PROJECT_ID: i64 = 217727;

pub fn test_config() -> ProviderConfig {
    ProviderConfig::new("test-token")
}

/// Whether `name` is `<prefix>-` followed by six lowercase hex chars
pub fn is_generated_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(&format!("{}-", prefix))
        .is_some_and(|suffix| {
            suffix.len() == 6
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        })
}

fn not_found(what: &str, id: impl fmt::Display) -> ApiError {
    ApiError::with_status(404, format!("{} {} not found", what, id))
}

/// In-memory projects API
#[derive(Clone, Default)]
pub struct FakeProjectApi {
    projects: Arc<Mutex<HashMap<i64, Project>>>,
    next_id: Arc<AtomicI64>,
    fail_with: Arc<Mutex<Option<ApiError>>>,
    get_failure: Arc<Mutex<Option<ApiError>>>,
    last_update: Arc<Mutex<Option<UpdateProject>>>,
    create_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    factory_calls: Arc<AtomicUsize>,
}

impl FakeProjectApi {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicI64::new(148226)),
            ..Default::default()
        }
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&self, error: ApiError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    /// Factory handing out clients that share this fake
    pub fn factory(&self) -> Arc<dyn ProjectClientFactory> {
        let api = self.clone();
        Arc::new(
            move |_config: &ProviderConfig| -> cherry_core::Result<Box<dyn ProjectClient>> {
                api.factory_calls.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(api.clone()))
            },
        )
    }

    pub fn project(&self, id: i64) -> Option<Project> {
        self.projects.lock().unwrap().get(&id).cloned()
    }

    pub fn last_update(&self) -> Option<UpdateProject> {
        self.last_update.lock().unwrap().clone()
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn factory_call_count(&self) -> usize {
        self.factory_calls.load(Ordering::SeqCst)
    }

    pub fn remote_call_count(&self) -> usize {
        self.create_call_count()
            + self.get_call_count()
            + self.update_call_count()
            + self.delete_call_count()
    }

    fn injected_failure(&self) -> Result<(), ApiError> {
        match self.fail_with.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProjectClient for FakeProjectApi {
    async fn create(&self, _team_id: i64, request: &CreateProject) -> ApiResult<Project> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let project = Project {
            id,
            name: request.name.clone(),
            bgp: ProjectBgp {
                enabled: request.bgp,
                local_asn: if request.bgp { 65000 } else { 0 },
            },
            href: format!("/projects/{}", id),
        };
        self.projects.lock().unwrap().insert(id, project.clone());
        Ok((project, Response::new(201)))
    }

    async fn get(&self, project_id: i64) -> ApiResult<Project> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.get_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.injected_failure()?;

        self.project(project_id)
            .map(|project| (project, Response::new(200)))
            .ok_or_else(|| not_found("project", project_id))
    }

    async fn update(&self, project_id: i64, request: &UpdateProject) -> ApiResult<Project> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        *self.last_update.lock().unwrap() = Some(request.clone());

        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(&project_id)
            .ok_or_else(|| not_found("project", project_id))?;
        if let Some(name) = &request.name {
            project.name = name.clone();
        }
        if let Some(bgp) = request.bgp {
            project.bgp.enabled = bgp;
        }
        Ok((project.clone(), Response::new(200)))
    }

    async fn delete(&self, project_id: i64) -> Result<Response, ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;

        self.projects
            .lock()
            .unwrap()
            .remove(&project_id)
            .map(|_| Response::new(204))
            .ok_or_else(|| not_found("project", project_id))
    }
}

/// In-memory IP addresses API with delayed provisioning
///
/// A created address has no `address` and no server assignment until
/// `provisioning_reads` further `get` calls have been served.
#[derive(Clone, Default)]
pub struct FakeIpApi {
    ips: Arc<Mutex<HashMap<String, IpAddress>>>,
    pending_targets: Arc<Mutex<HashMap<String, i64>>>,
    provisioning_reads: Arc<AtomicUsize>,
    next_id: Arc<AtomicI64>,
    last_create: Arc<Mutex<Option<CreateIpAddress>>>,
    last_update: Arc<Mutex<Option<UpdateIpAddress>>>,
    create_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    get_failure: Arc<Mutex<Option<ApiError>>>,
    delete_failure: Arc<Mutex<Option<ApiError>>>,
}

impl FakeIpApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `get` fail with `error`
    pub fn fail_gets_with(&self, error: ApiError) {
        *self.get_failure.lock().unwrap() = Some(error);
    }

    /// Make every following `delete` fail with `error`
    pub fn fail_deletes_with(&self, error: ApiError) {
        *self.delete_failure.lock().unwrap() = Some(error);
    }

    /// Number of `get` calls that still report an unprovisioned address
    pub fn with_provisioning_reads(self, reads: usize) -> Self {
        self.provisioning_reads.store(reads, Ordering::SeqCst);
        self
    }

    pub fn factory(&self) -> Arc<dyn IpClientFactory> {
        let api = self.clone();
        Arc::new(
            move |_config: &ProviderConfig| -> cherry_core::Result<Box<dyn IpClient>> {
                Ok(Box::new(api.clone()))
            },
        )
    }

    /// Seed an already provisioned address
    pub fn insert(&self, ip: IpAddress) {
        self.ips.lock().unwrap().insert(ip.id.clone(), ip);
    }

    pub fn ip(&self, id: &str) -> Option<IpAddress> {
        self.ips.lock().unwrap().get(id).cloned()
    }

    pub fn last_create(&self) -> Option<CreateIpAddress> {
        self.last_create.lock().unwrap().clone()
    }

    pub fn last_update(&self) -> Option<UpdateIpAddress> {
        self.last_update.lock().unwrap().clone()
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn provision(&self, id: &str) {
        let target = self.pending_targets.lock().unwrap().remove(id);
        let mut ips = self.ips.lock().unwrap();
        if let Some(ip) = ips.get_mut(id) {
            ip.address = "5.199.171.10".to_string();
            ip.cidr = format!("{}/32", ip.address);
            ip.address_family = 4;
            ip.targeted_to = target.map(|id| AssignedServer { id });
        }
    }
}

#[async_trait]
impl IpClient for FakeIpApi {
    async fn create(&self, _project_id: i64, request: &CreateIpAddress) -> ApiResult<IpAddress> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_create.lock().unwrap() = Some(request.clone());

        let id = format!("ip-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let ip = IpAddress {
            id: id.clone(),
            kind: "floating-ip".into(),
            region: IpRegion {
                id: 1,
                name: "Lithuania".into(),
                slug: request.region.clone(),
            },
            routed_to: (!request.routed_to.is_empty()).then(|| RoutedTo {
                id: request.routed_to.clone(),
            }),
            ptr_record: request.ptr_record.clone(),
            a_record: request.a_record.clone(),
            tags: request.tags.clone(),
            ..Default::default()
        };
        self.ips.lock().unwrap().insert(id.clone(), ip.clone());
        if let Some(target) = request.targeted_to {
            self.pending_targets.lock().unwrap().insert(id.clone(), target);
        }
        if self.provisioning_reads.load(Ordering::SeqCst) == 0 {
            self.provision(&id);
            return Ok((self.ip(&id).unwrap_or(ip), Response::new(201)));
        }
        Ok((ip, Response::new(201)))
    }

    async fn get(&self, ip_id: &str) -> ApiResult<IpAddress> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.get_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let remaining = self.provisioning_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.provisioning_reads.store(remaining - 1, Ordering::SeqCst);
        } else {
            self.provision(ip_id);
        }

        self.ip(ip_id)
            .map(|ip| (ip, Response::new(200)))
            .ok_or_else(|| not_found("ip address", ip_id))
    }

    async fn update(&self, ip_id: &str, request: &UpdateIpAddress) -> ApiResult<IpAddress> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some(request.clone());

        let mut ips = self.ips.lock().unwrap();
        let ip = ips
            .get_mut(ip_id)
            .ok_or_else(|| not_found("ip address", ip_id))?;
        if let Some(ptr) = &request.ptr_record {
            ip.ptr_record = ptr.clone();
        }
        if let Some(a) = &request.a_record {
            ip.a_record = a.clone();
        }
        if let Some(routed) = &request.routed_to {
            ip.routed_to = (!routed.is_empty()).then(|| RoutedTo { id: routed.clone() });
        }
        if let Some(target) = request.targeted_to {
            ip.targeted_to = (target != 0).then_some(AssignedServer { id: target });
        }
        if let Some(tags) = &request.tags {
            ip.tags = tags.clone();
        }
        Ok((ip.clone(), Response::new(200)))
    }

    async fn delete(&self, ip_id: &str) -> Result<Response, ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.delete_failure.lock().unwrap().clone() {
            return Err(error);
        }

        self.ips
            .lock()
            .unwrap()
            .remove(ip_id)
            .map(|_| Response::new(204))
            .ok_or_else(|| not_found("ip address", ip_id))
    }
}

/// Logger that records every warning
#[derive(Clone, Default)]
pub struct RecordingLogger {
    warnings: Arc<Mutex<Vec<String>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn warning(&self, message: fmt::Arguments<'_>) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}
