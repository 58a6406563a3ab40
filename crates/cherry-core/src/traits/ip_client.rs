// # IP Address Client Trait
//
// Defines the subset of the Cherry Servers IP addresses API the IP
// controller needs. Same conventions as the project client: one call per
// method, status-carrying errors, no retries.

use crate::config::ProviderConfig;
use crate::traits::api::{ApiError, ApiResult, Response};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// IP address as returned by the remote API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    /// IP address ID
    pub id: String,
    /// The address itself; empty until provisioned
    #[serde(default)]
    pub address: String,
    /// 4 or 6
    #[serde(default)]
    pub address_family: i64,
    /// CIDR notation
    #[serde(default)]
    pub cidr: String,
    /// Address type (e.g. `floating-ip`, `subnet`)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Region the address lives in
    #[serde(default)]
    pub region: IpRegion,
    /// Address this one is routed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routed_to: Option<RoutedTo>,
    /// Server this address targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeted_to: Option<AssignedServer>,
    /// PTR record
    #[serde(default)]
    pub ptr_record: String,
    /// A record
    #[serde(default)]
    pub a_record: String,
    /// Tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Region reference embedded in an IP address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRegion {
    /// Region ID
    #[serde(default)]
    pub id: i64,
    /// Region display name
    #[serde(default)]
    pub name: String,
    /// Region slug (e.g. `LT-Siauliai`)
    #[serde(default)]
    pub slug: String,
}

/// Routing target reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedTo {
    /// ID of the IP address routed to
    #[serde(default)]
    pub id: String,
}

/// Server reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedServer {
    /// Server ID
    #[serde(default)]
    pub id: i64,
}

/// Request body for IP address creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateIpAddress {
    /// Region slug
    pub region: String,
    /// PTR record
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ptr_record: String,
    /// A record
    #[serde(skip_serializing_if = "String::is_empty")]
    pub a_record: String,
    /// IP address ID to route to
    #[serde(skip_serializing_if = "String::is_empty")]
    pub routed_to: String,
    /// Server ID to target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_to: Option<i64>,
    /// Tags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Request body for IP address updates
///
/// Region and project cannot change in place and are absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateIpAddress {
    /// PTR record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr_record: Option<String>,
    /// A record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_record: Option<String>,
    /// IP address ID to route to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routed_to: Option<String>,
    /// Server ID to target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_to: Option<i64>,
    /// Tags, replacing the existing set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

/// Remote IP address operations
#[async_trait]
pub trait IpClient: Send + Sync {
    /// Request a new address in `project_id`
    async fn create(&self, project_id: i64, request: &CreateIpAddress) -> ApiResult<IpAddress>;

    /// Fetch an address
    async fn get(&self, ip_id: &str) -> ApiResult<IpAddress>;

    /// Update the mutable fields of an address
    async fn update(&self, ip_id: &str, request: &UpdateIpAddress) -> ApiResult<IpAddress>;

    /// Release an address
    async fn delete(&self, ip_id: &str) -> Result<Response, ApiError>;
}

/// Builds an [`IpClient`] bound to runtime configuration
pub trait IpClientFactory: Send + Sync {
    /// Create a client from configuration
    fn create(&self, config: &ProviderConfig) -> crate::Result<Box<dyn IpClient>>;
}

impl<F> IpClientFactory for F
where
    F: Fn(&ProviderConfig) -> crate::Result<Box<dyn IpClient>> + Send + Sync,
{
    fn create(&self, config: &ProviderConfig) -> crate::Result<Box<dyn IpClient>> {
        self(config)
    }
}
