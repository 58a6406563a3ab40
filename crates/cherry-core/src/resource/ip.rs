// # IP Address Controller
//
// Lifecycle of a Cherry Servers IP address.
//
// ## Field semantics
//
// - `region`, `project`: placement; changing either replaces the address
// - `ptrRecord`, `aRecord`, `routedTo`, `targetedTo`, `tags`: mutable in place
// - `address`, `addressFamily`, `cidr`, `type`: assigned by the platform
//
// Addresses are provisioned asynchronously. Create returns only after the
// platform reports an address and, when requested, the server assignment.

use crate::config::ProviderConfig;
use crate::context::Context;
use crate::diff::{self, DiffKind, DiffRecord, DiffRule};
use crate::error::{Error, Result};
use crate::poll::Poller;
use crate::resource::{
    CheckRequest, Controller, CreateRequest, CreateResponse, DeleteRequest, DiffRequest,
    ReadRequest, ReadResponse, UpdateRequest,
};
use crate::schema::{FieldDependency, FieldSpec, ResourceSchema};
use crate::traits::{
    CreateIpAddress, IpAddress, IpClient, IpClientFactory, Logger, TracingLogger,
    UpdateIpAddress,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Type token of the IP address resource
pub const IP_ADDRESS_TOKEN: &str = "cherry-servers:index:IpAddress";

/// Desired IP address inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressArgs {
    /// Region slug
    pub region: String,
    /// Project ID
    pub project: i64,
    #[serde(default)]
    pub ptr_record: String,
    #[serde(default)]
    pub a_record: String,
    /// ID of the IP address this one is routed to; empty for none
    #[serde(default)]
    pub routed_to: String,
    /// ID of the server this address targets; 0 for none
    #[serde(default)]
    pub targeted_to: i64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed IP address state
///
/// Mirrors the inputs as persisted remotely, plus platform-assigned fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressState {
    #[serde(flatten)]
    pub args: IpAddressArgs,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address_family: i64,
    #[serde(default)]
    pub cidr: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl IpAddressState {
    fn from_remote(ip: IpAddress, project: i64) -> Self {
        Self {
            args: IpAddressArgs {
                region: ip.region.slug,
                project,
                ptr_record: ip.ptr_record,
                a_record: ip.a_record,
                routed_to: ip.routed_to.map(|r| r.id).unwrap_or_default(),
                targeted_to: ip.targeted_to.map(|s| s.id).unwrap_or_default(),
                tags: ip.tags,
            },
            address: ip.address,
            address_family: ip.address_family,
            cidr: ip.cidr,
            kind: ip.kind,
        }
    }

    fn projected(args: IpAddressArgs) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }
}

/// Whether the platform has finished provisioning `ip` as requested
fn is_provisioned(ip: &IpAddress, targeted_to: i64) -> bool {
    if ip.address.is_empty() {
        return false;
    }
    targeted_to == 0 || ip.targeted_to.as_ref().map(|s| s.id) == Some(targeted_to)
}

const DIFF_RULES: &[DiffRule<IpAddressArgs, IpAddressState>] = &[
    DiffRule {
        field: "region",
        kind: DiffKind::Replace,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.region != s.args.region,
    },
    DiffRule {
        field: "project",
        kind: DiffKind::Replace,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.project != s.args.project,
    },
    DiffRule {
        field: "ptrRecord",
        kind: DiffKind::Update,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.ptr_record != s.args.ptr_record,
    },
    DiffRule {
        field: "aRecord",
        kind: DiffKind::Update,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.a_record != s.args.a_record,
    },
    DiffRule {
        field: "routedTo",
        kind: DiffKind::Update,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.routed_to != s.args.routed_to,
    },
    DiffRule {
        field: "targetedTo",
        kind: DiffKind::Update,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.targeted_to != s.args.targeted_to,
    },
    DiffRule {
        field: "tags",
        kind: DiffKind::Update,
        differs: |i: &IpAddressArgs, s: &IpAddressState| i.tags != s.args.tags,
    },
];

const PLACEMENT: &[&str] = &["region", "project"];
const ASSIGNMENT: &[&str] = &["routedTo", "targetedTo"];

/// IP address schema descriptor
pub static IP_ADDRESS_SCHEMA: ResourceSchema = ResourceSchema {
    token: IP_ADDRESS_TOKEN,
    description: "Cherry Servers IP address.",
    inputs: &[
        FieldSpec::required("region", "IP address region slug."),
        FieldSpec::required("project", "IP address project ID."),
        FieldSpec::optional("ptrRecord", "IP address PTR record."),
        FieldSpec::optional("aRecord", "IP address A record."),
        FieldSpec::optional("routedTo", "IP address that this address is routed to."),
        FieldSpec::optional("targetedTo", "Server that this address is targeted to."),
        FieldSpec::optional("tags", "IP address tags."),
    ],
    outputs: &[
        FieldSpec::required("region", "IP address region slug."),
        FieldSpec::required("project", "IP address project ID."),
        FieldSpec::required("ptrRecord", "IP address PTR record."),
        FieldSpec::required("aRecord", "IP address A record."),
        FieldSpec::required("routedTo", "IP address that this address is routed to."),
        FieldSpec::required("targetedTo", "Server that this address is targeted to."),
        FieldSpec::required("tags", "IP address tags."),
        FieldSpec::required("address", "Actual address."),
        FieldSpec::required("addressFamily", "IP address family."),
        FieldSpec::required("cidr", "IP address CIDR."),
        FieldSpec::required("type", "IP address type."),
    ],
    dependencies: &[
        FieldDependency {
            output: "region",
            inputs: &["region"],
        },
        FieldDependency {
            output: "project",
            inputs: &["project"],
        },
        FieldDependency {
            output: "ptrRecord",
            inputs: &["ptrRecord"],
        },
        FieldDependency {
            output: "aRecord",
            inputs: &["aRecord"],
        },
        FieldDependency {
            output: "routedTo",
            inputs: ASSIGNMENT,
        },
        FieldDependency {
            output: "targetedTo",
            inputs: ASSIGNMENT,
        },
        FieldDependency {
            output: "tags",
            inputs: &["tags"],
        },
        FieldDependency {
            output: "address",
            inputs: PLACEMENT,
        },
        FieldDependency {
            output: "addressFamily",
            inputs: PLACEMENT,
        },
        FieldDependency {
            output: "cidr",
            inputs: PLACEMENT,
        },
        FieldDependency {
            output: "type",
            inputs: PLACEMENT,
        },
    ],
};

/// IP address lifecycle controller
pub struct IpAddressController {
    clients: Arc<dyn IpClientFactory>,
    logger: Arc<dyn Logger>,
    config: ProviderConfig,
    poller: Poller,
}

impl IpAddressController {
    /// Create a controller
    ///
    /// # Returns
    ///
    /// - `Err(Error::InvalidInterval)`: If the configured poller jitter is invalid
    pub fn new(clients: Arc<dyn IpClientFactory>, config: ProviderConfig) -> Result<Self> {
        let poller = config.poller.build()?;
        Ok(Self {
            clients,
            logger: Arc::new(TracingLogger),
            config,
            poller,
        })
    }

    /// Replace the warning sink
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the provisioning poller
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    fn client(&self) -> Result<Box<dyn IpClient>> {
        self.clients.create(&self.config)
    }

    /// Poll until `created` is provisioned and return its final remote view
    async fn await_provisioned(
        &self,
        ctx: &Context,
        client: &dyn IpClient,
        created: IpAddress,
        targeted_to: i64,
    ) -> Result<IpAddress> {
        if is_provisioned(&created, targeted_to) {
            return Ok(created);
        }

        let id = created.id.clone();
        let latest = Mutex::new(created);
        let (id, latest_ref) = (&id, &latest);

        self.poller
            .until(ctx, move |_ctx| async move {
                let (ip, _) = client.get(id).await?;
                let ready = is_provisioned(&ip, targeted_to);
                if !ready {
                    debug!("IP address {} not provisioned yet", id);
                }
                *latest_ref.lock().await = ip;
                Ok::<_, Error>(ready)
            })
            .await?;

        Ok(latest.into_inner())
    }

    /// Best-effort delete of an address whose create did not complete
    ///
    /// Runs outside the caller's context: the context is usually already
    /// cancelled when this is reached.
    async fn release(&self, client: &dyn IpClient, id: &str) {
        match client.delete(id).await {
            Ok(_) => info!("Released unprovisioned IP address {}", id),
            Err(e) if e.is_not_found() => debug!("Unprovisioned IP address {} already gone", id),
            Err(e) => self
                .logger
                .warning(format_args!("failed to release ip address {}: {}", id, e)),
        }
    }
}

#[async_trait]
impl Controller for IpAddressController {
    type Inputs = IpAddressArgs;
    type State = IpAddressState;

    fn schema(&self) -> &'static ResourceSchema {
        &IP_ADDRESS_SCHEMA
    }

    async fn check(
        &self,
        _ctx: &Context,
        request: CheckRequest<IpAddressArgs, IpAddressState>,
    ) -> Result<IpAddressArgs> {
        Ok(request.inputs)
    }

    async fn create(
        &self,
        ctx: &Context,
        request: CreateRequest<IpAddressArgs>,
    ) -> Result<CreateResponse<IpAddressState>> {
        let inputs = request.inputs;

        if request.dry_run {
            debug!("Dry run: skipping IP address creation");
            return Ok(CreateResponse {
                id: None,
                state: IpAddressState::projected(inputs),
            });
        }

        let client = self.client()?;
        let body = CreateIpAddress {
            region: inputs.region.clone(),
            ptr_record: inputs.ptr_record.clone(),
            a_record: inputs.a_record.clone(),
            routed_to: inputs.routed_to.clone(),
            targeted_to: (inputs.targeted_to != 0).then_some(inputs.targeted_to),
            tags: inputs.tags.clone(),
        };

        let (created, _) = ctx.guard(client.create(inputs.project, &body)).await??;
        info!(
            "Requested IP address {} in project {}",
            created.id, inputs.project
        );

        let id = created.id.clone();
        let ip = match self
            .await_provisioned(ctx, client.as_ref(), created, inputs.targeted_to)
            .await
        {
            Ok(ip) => ip,
            Err(e) => {
                self.release(client.as_ref(), &id).await;
                return Err(e);
            }
        };

        Ok(CreateResponse {
            id: Some(ip.id.clone()),
            state: IpAddressState::from_remote(ip, inputs.project),
        })
    }

    async fn read(
        &self,
        ctx: &Context,
        request: ReadRequest<IpAddressArgs>,
    ) -> Result<Option<ReadResponse<IpAddressArgs, IpAddressState>>> {
        let client = self.client()?;

        let ip = match ctx.guard(client.get(&request.id)).await? {
            Ok((ip, _)) => ip,
            Err(e) if e.is_not_found() => {
                debug!("IP address {} not found", request.id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let project = request.inputs.project;
        Ok(Some(ReadResponse {
            id: request.id,
            inputs: request.inputs,
            state: IpAddressState::from_remote(ip, project),
        }))
    }

    async fn update(
        &self,
        ctx: &Context,
        request: UpdateRequest<IpAddressArgs, IpAddressState>,
    ) -> Result<IpAddressState> {
        let prior = request.state;
        let inputs = request.inputs;

        if request.dry_run {
            debug!("Dry run: skipping IP address update");
            return Ok(IpAddressState::projected(IpAddressArgs {
                region: prior.args.region,
                project: prior.args.project,
                ..inputs
            }));
        }

        let client = self.client()?;
        let body = UpdateIpAddress {
            ptr_record: Some(inputs.ptr_record),
            a_record: Some(inputs.a_record),
            routed_to: Some(inputs.routed_to),
            targeted_to: Some(inputs.targeted_to),
            tags: Some(inputs.tags),
        };

        let (ip, _) = ctx.guard(client.update(&request.id, &body)).await??;
        info!("Updated IP address {}", request.id);

        Ok(IpAddressState::from_remote(ip, prior.args.project))
    }

    async fn delete(&self, ctx: &Context, request: DeleteRequest<IpAddressState>) -> Result<()> {
        let client = self.client()?;

        match ctx.guard(client.delete(&request.id)).await? {
            Ok(_) => {
                info!("Deleted IP address {}", request.id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.logger
                    .warning(format_args!("ip address {} already deleted", request.id));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn diff(&self, request: &DiffRequest<IpAddressArgs, IpAddressState>) -> DiffRecord {
        diff::diff(DIFF_RULES, &request.inputs, &request.state, true)
    }
}
