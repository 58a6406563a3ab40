// # Project Client Trait
//
// Defines the subset of the Cherry Servers projects API the project
// controller needs.
//
// ## Implementations
//
// - HTTP: `cherry-api` crate
// - Test doubles: `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use cherry_core::traits::{CreateProject, ProjectClient};
//
// let (project, _response) = client
//     .create(148226, &CreateProject { name: "web".into(), bgp: false })
//     .await?;
// println!("created project {}", project.id);
// ```

use crate::config::ProviderConfig;
use crate::traits::api::{ApiError, ApiResult, Response};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Project as returned by the remote API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Numeric project ID
    pub id: i64,
    /// Project name
    #[serde(default)]
    pub name: String,
    /// BGP settings
    #[serde(default)]
    pub bgp: ProjectBgp,
    /// API link to the project
    #[serde(default)]
    pub href: String,
}

/// BGP settings of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBgp {
    /// Whether BGP is enabled
    #[serde(default)]
    pub enabled: bool,
    /// Local ASN assigned by the platform
    #[serde(default)]
    pub local_asn: i64,
}

/// Request body for project creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProject {
    /// Project name
    pub name: String,
    /// Enable BGP
    pub bgp: bool,
}

/// Request body for project updates
///
/// Only the fields the platform allows mutating; unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateProject {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New BGP setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp: Option<bool>,
}

/// Remote project operations
///
/// # Contract
///
/// - One remote call per method; no retries, no caching
/// - Errors carry the response status when the server answered, so callers
///   can recognise "not found"
#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// Create a project owned by `team_id`
    async fn create(&self, team_id: i64, request: &CreateProject) -> ApiResult<Project>;

    /// Fetch a project
    async fn get(&self, project_id: i64) -> ApiResult<Project>;

    /// Update the mutable fields of a project
    async fn update(&self, project_id: i64, request: &UpdateProject) -> ApiResult<Project>;

    /// Delete a project
    async fn delete(&self, project_id: i64) -> Result<Response, ApiError>;
}

/// Builds a [`ProjectClient`] bound to runtime configuration
///
/// Called once per controller operation; the client lives for that call only.
pub trait ProjectClientFactory: Send + Sync {
    /// Create a client from configuration
    fn create(&self, config: &ProviderConfig) -> crate::Result<Box<dyn ProjectClient>>;
}

impl<F> ProjectClientFactory for F
where
    F: Fn(&ProviderConfig) -> crate::Result<Box<dyn ProjectClient>> + Send + Sync,
{
    fn create(&self, config: &ProviderConfig) -> crate::Result<Box<dyn ProjectClient>> {
        self(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_omits_unset_fields() {
        let body = serde_json::to_value(UpdateProject {
            name: Some("renamed".into()),
            bgp: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"name": "renamed"}));
    }

    #[test]
    fn test_project_decodes_with_missing_fields() {
        let project: Project = serde_json::from_str(r#"{"id": 7, "name": "web"}"#).unwrap();
        assert_eq!(project.id, 7);
        assert!(!project.bgp.enabled);
        assert_eq!(project.bgp.local_asn, 0);
    }
}
