//! Resource registry
//!
//! Controllers are registered under their type token and invoked through a
//! JSON-erased interface, so a driver can dispatch by token without knowing
//! each controller's input and state types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cherry_core::registry::{Operation, ResourceRegistry};
//!
//! let registry = ResourceRegistry::new();
//! registry.register(project_controller)?;
//!
//! let response = registry
//!     .dispatch(&ctx, "cherry-servers:index:Project", Operation::Create, payload)
//!     .await?;
//! ```
//!
//! ## Registration
//!
//! Client crates expose a `register` function that builds the controllers
//! with their own factories and adds them here.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::resource::{
    CheckRequest, Controller, CreateRequest, DeleteRequest, DiffRequest, ReadRequest,
    UpdateRequest,
};
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Lifecycle operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Check,
    Create,
    Read,
    Update,
    Delete,
    Diff,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Check => "check",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Diff => "diff",
        };
        f.write_str(name)
    }
}

/// Controller with its types erased to JSON
#[async_trait]
pub trait ErasedResource: Send + Sync {
    /// Static schema descriptor
    fn schema(&self) -> &'static ResourceSchema;

    /// Decode `payload`, run `operation`, encode the result
    async fn call(&self, ctx: &Context, operation: Operation, payload: Value) -> Result<Value>;
}

#[async_trait]
impl<C> ErasedResource for C
where
    C: Controller,
{
    fn schema(&self) -> &'static ResourceSchema {
        Controller::schema(self)
    }

    async fn call(&self, ctx: &Context, operation: Operation, payload: Value) -> Result<Value> {
        let schema = Controller::schema(self);

        match operation {
            Operation::Check | Operation::Create | Operation::Update => {
                let inputs = payload.get("inputs").unwrap_or(&Value::Null);
                schema.validate(inputs)?;
            }
            Operation::Read | Operation::Delete | Operation::Diff => {}
        }

        match operation {
            Operation::Check => {
                let request: CheckRequest<C::Inputs, C::State> = serde_json::from_value(payload)?;
                let inputs = self.check(ctx, request).await?;
                Ok(json!({ "inputs": inputs }))
            }
            Operation::Create => {
                let request: CreateRequest<C::Inputs> = serde_json::from_value(payload)?;
                let response = self.create(ctx, request).await?;
                Ok(serde_json::to_value(response)?)
            }
            Operation::Read => {
                let request: ReadRequest<C::Inputs> = serde_json::from_value(payload)?;
                let response = self.read(ctx, request).await?;
                Ok(serde_json::to_value(response)?)
            }
            Operation::Update => {
                let request: UpdateRequest<C::Inputs, C::State> = serde_json::from_value(payload)?;
                let state = self.update(ctx, request).await?;
                Ok(json!({ "state": state }))
            }
            Operation::Delete => {
                let request: DeleteRequest<C::State> = serde_json::from_value(payload)?;
                self.delete(ctx, request).await?;
                Ok(json!({}))
            }
            Operation::Diff => {
                let request: DiffRequest<C::Inputs, C::State> = serde_json::from_value(payload)?;
                Ok(serde_json::to_value(self.diff(&request))?)
            }
        }
    }
}

/// Registry of resource controllers keyed by type token
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// dispatch and exclusive registration.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: RwLock<HashMap<String, Arc<dyn ErasedResource>>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller under its schema token
    ///
    /// # Returns
    ///
    /// - `Err(Error::Validation)`: If the controller's dependency table is incomplete
    pub fn register<C>(&self, controller: C) -> Result<()>
    where
        C: Controller + 'static,
    {
        let schema = Controller::schema(&controller);
        schema.check_dependencies()?;

        let mut resources = self
            .resources
            .write()
            .map_err(|_| Error::Other("resource registry lock poisoned".to_string()))?;
        resources.insert(schema.token.to_string(), Arc::new(controller));
        debug!("Registered resource {}", schema.token);
        Ok(())
    }

    /// Look up a controller by token
    pub fn get(&self, token: &str) -> Result<Arc<dyn ErasedResource>> {
        let resources = self
            .resources
            .read()
            .map_err(|_| Error::Other("resource registry lock poisoned".to_string()))?;
        resources
            .get(token)
            .cloned()
            .ok_or_else(|| Error::unknown_resource(token))
    }

    /// Check if a token is registered
    pub fn has_resource(&self, token: &str) -> bool {
        self.resources
            .read()
            .map(|resources| resources.contains_key(token))
            .unwrap_or(false)
    }

    /// Registered tokens, sorted
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .resources
            .read()
            .map(|resources| resources.keys().cloned().collect())
            .unwrap_or_default();
        tokens.sort();
        tokens
    }

    /// Invoke `operation` on the controller registered under `token`
    pub async fn dispatch(
        &self,
        ctx: &Context,
        token: &str,
        operation: Operation,
        payload: Value,
    ) -> Result<Value> {
        let resource = self.get(token)?;
        debug!("Dispatching {} to {}", operation, token);
        resource.call(ctx, operation, payload).await
    }
}
