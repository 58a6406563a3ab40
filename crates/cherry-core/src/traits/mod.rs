//! Collaborator contracts for the provider core
//!
//! Controllers depend only on these narrow interfaces, never on a concrete
//! HTTP client or log sink.
//!
//! - [`ProjectClient`]: Remote project operations
//! - [`IpClient`]: Remote IP address operations
//! - [`Logger`]: Warning sink for benign reconciliation notices

pub mod api;
pub mod ip_client;
pub mod logger;
pub mod project_client;

pub use api::{ApiError, ApiResult, Response};
pub use ip_client::{
    AssignedServer, CreateIpAddress, IpAddress, IpClient, IpClientFactory, IpRegion, RoutedTo,
    UpdateIpAddress,
};
pub use logger::{Logger, TracingLogger};
pub use project_client::{
    CreateProject, Project, ProjectBgp, ProjectClient, ProjectClientFactory, UpdateProject,
};
