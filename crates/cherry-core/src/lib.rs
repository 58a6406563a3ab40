// # cherry-core
//
// Core library for the Cherry Servers resource provider.
//
// ## Architecture Overview
//
// This library implements the resource reconciliation contract an external
// orchestration engine drives to converge Cherry Servers projects and IP
// addresses toward declared state:
// - **Controller**: Create / Read / Update / Delete / Diff per resource kind
// - **ProjectClient / IpClient**: Narrow remote API traits, implemented elsewhere
// - **Poller**: Retry-until-condition with constant delay plus jitter
// - **autoname**: Stable name selection for optionally named resources
// - **ResourceRegistry**: Token-keyed, JSON-erased controller dispatch
//
// ## Design Principles
//
// 1. **Stateless controllers**: All state travels with each request
// 2. **Static tables**: Diff rules, schemas and field dependencies are data
// 3. **Library-First**: The HTTP client and process entry point are separate crates
// 4. **Idempotent deletes**: "Not found" on delete is success, with a warning

pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod naming;
pub mod poll;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod traits;

// Re-export core types for convenience
pub use config::{PollerConfig, ProviderConfig};
pub use context::{CancelCause, CancelHandle, Context};
pub use diff::{DiffKind, DiffRecord};
pub use error::{Error, Result};
pub use naming::autoname;
pub use poll::{JitterInterval, Poller};
pub use registry::{Operation, ResourceRegistry};
pub use resource::{Controller, IpAddressController, ProjectController};
pub use traits::{IpClient, Logger, ProjectClient};
