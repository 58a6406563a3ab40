//! Resource controllers
//!
//! A controller owns the full lifecycle of one remote object kind. The
//! orchestration engine drives it through [`Controller`]; every call is
//! independent, carries its own [`Context`], and resolves a fresh remote
//! client from the controller's factory.
//!
//! - [`ProjectController`]: Cherry Servers projects
//! - [`IpAddressController`]: Cherry Servers IP addresses

pub mod ip;
pub mod project;

pub use ip::{IpAddressArgs, IpAddressController, IpAddressState};
pub use project::{ProjectArgs, ProjectBgpState, ProjectController, ProjectState};

use crate::context::Context;
use crate::diff::DiffRecord;
use crate::error::Result;
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Input normalisation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest<I, S> {
    /// Logical resource name assigned by the engine
    pub name: String,
    /// Desired inputs
    pub inputs: I,
    /// Prior observed state, if the resource exists
    pub state: Option<S>,
}

/// Create request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest<I> {
    /// Logical resource name assigned by the engine
    pub name: String,
    /// Desired inputs
    pub inputs: I,
    /// Preview only; no remote call
    #[serde(default)]
    pub dry_run: bool,
}

/// Create result
///
/// `id` is `None` only for dry runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse<S> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub state: S,
}

/// Read request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest<I> {
    /// Remote identifier
    pub id: String,
    /// Inputs as last supplied by the engine
    pub inputs: I,
}

/// Read result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse<I, S> {
    pub id: String,
    pub inputs: I,
    pub state: S,
}

/// Update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest<I, S> {
    /// Remote identifier
    pub id: String,
    /// Logical resource name assigned by the engine
    #[serde(default)]
    pub name: String,
    /// Desired inputs
    pub inputs: I,
    /// Prior observed state
    pub state: S,
    /// Preview only; no remote call
    #[serde(default)]
    pub dry_run: bool,
}

/// Delete request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<S> {
    pub id: String,
    pub state: S,
}

/// Diff request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest<I, S> {
    #[serde(default)]
    pub id: String,
    pub inputs: I,
    pub state: S,
}

/// Lifecycle operations of one resource kind
///
/// # Contract
///
/// - Controllers hold no per-resource state between calls
/// - `create` and `update` never report an id for a failed remote call
/// - A `create` that fails after the remote object exists deletes it again
/// - Remote failures surface unmodified as [`Error::Remote`](crate::Error::Remote),
///   except "not found" on `read` (`Ok(None)`) and `delete` (`Ok(())`)
/// - `diff` is pure and never contacts the remote API
#[async_trait]
pub trait Controller: Send + Sync {
    /// Desired inputs of this kind
    type Inputs: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    /// Observed state of this kind
    type State: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Static schema descriptor
    fn schema(&self) -> &'static ResourceSchema;

    /// Normalise inputs before any other operation sees them
    async fn check(
        &self,
        ctx: &Context,
        request: CheckRequest<Self::Inputs, Self::State>,
    ) -> Result<Self::Inputs>;

    /// Create the remote object
    async fn create(
        &self,
        ctx: &Context,
        request: CreateRequest<Self::Inputs>,
    ) -> Result<CreateResponse<Self::State>>;

    /// Refresh observed state; `None` when the object no longer exists
    async fn read(
        &self,
        ctx: &Context,
        request: ReadRequest<Self::Inputs>,
    ) -> Result<Option<ReadResponse<Self::Inputs, Self::State>>>;

    /// Apply in-place changes
    async fn update(
        &self,
        ctx: &Context,
        request: UpdateRequest<Self::Inputs, Self::State>,
    ) -> Result<Self::State>;

    /// Delete the remote object
    async fn delete(&self, ctx: &Context, request: DeleteRequest<Self::State>) -> Result<()>;

    /// Classify differences between desired inputs and observed state
    fn diff(&self, request: &DiffRequest<Self::Inputs, Self::State>) -> DiffRecord;
}
