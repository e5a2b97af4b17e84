//! In-process stand-in for the execution platform and its HTTP gateway.
//!
//! Functions are registered against code bundles keyed by entry point, and
//! endpoints forward every request to the function they are bound to. State
//! lives only as long as the [`LocalPlatform`] (and its clones).

pub mod endpoint;
pub mod function;
pub mod gateway;

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{
    descriptor::{endpoint::AccessPolicy, function::EntryPoint},
    handler::{IncomingRequest, RequestHandler},
    manager::ManagerError,
    provider::{EndpointManager, EndpointOutput, FunctionManager, FunctionOutput, Provider},
};
use endpoint::LocalEndpointManager;
use function::LocalFunctionManager;

pub const LOCAL_REGION: &str = "local-1";
pub const LOCAL_ACCOUNT: &str = "000000000000";

pub type Invocation<'a> =
    Pin<Box<dyn Future<Output = crate::v1::handler::OutgoingResponse> + Send + 'a>>;

/// Deployable code: what a function's entry point resolves to.
pub trait FunctionCode: Send + Sync {
    fn invoke(&self, event: IncomingRequest) -> Invocation<'_>;
}

impl FunctionCode for RequestHandler {
    fn invoke(&self, event: IncomingRequest) -> Invocation<'_> {
        Box::pin(self.handle(event))
    }
}

pub(crate) struct DeployedFunction {
    pub output: FunctionOutput,
    pub entry: EntryPoint,
}

pub(crate) struct DeployedApi {
    pub output: EndpointOutput,
    pub access: AccessPolicy,
}

#[derive(Default)]
pub(crate) struct PlatformState {
    pub code: HashMap<EntryPoint, Arc<dyn FunctionCode>>,
    pub functions: HashMap<String, DeployedFunction>,
    pub apis: HashMap<String, DeployedApi>,
    pub next_api: u64,
}

#[derive(Clone)]
pub struct LocalPlatform {
    state: Arc<Mutex<PlatformState>>,
    region: String,
}

impl Default for LocalPlatform {
    fn default() -> Self {
        Self::new(LOCAL_REGION)
    }
}

impl LocalPlatform {
    pub fn new(region: impl ToString) -> Self {
        Self {
            state: Default::default(),
            region: region.to_string(),
        }
    }

    /// Makes `code` available to functions whose entry point is `entry`.
    pub fn with_code(self, entry: EntryPoint, code: impl FunctionCode + 'static) -> Self {
        if let Ok(mut state) = self.state.lock() {
            tracing::debug!("Register code bundle for {}", entry);
            state.code.insert(entry, Arc::new(code));
        }
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn provider(&self) -> LocalProvider {
        LocalProvider {
            functions: Arc::new(LocalFunctionManager::new(self.clone())),
            endpoints: Arc::new(LocalEndpointManager::new(self.clone())),
        }
    }

    pub fn function_count(&self) -> usize {
        self.state.lock().map(|s| s.functions.len()).unwrap_or(0)
    }
    pub fn endpoint_count(&self) -> usize {
        self.state.lock().map(|s| s.apis.len()).unwrap_or(0)
    }
    pub fn endpoint_by_name(&self, name: &str) -> Option<EndpointOutput> {
        self.state.lock().ok().and_then(|s| {
            s.apis
                .values()
                .find(|api| api.output.name == name)
                .map(|api| api.output.clone())
        })
    }

    pub(crate) fn state(&self) -> Result<MutexGuard<'_, PlatformState>, ManagerError> {
        self.state
            .lock()
            .map_err(|err| ManagerError::LookupFail(format!("Platform state poisoned: {}", err)))
    }

    pub(crate) fn function_arn(&self, function_name: &str) -> String {
        format!(
            "arn:local:lambda:{}:{}:function:{}",
            self.region, LOCAL_ACCOUNT, function_name
        )
    }
}

pub struct LocalProvider {
    functions: Arc<LocalFunctionManager>,
    endpoints: Arc<LocalEndpointManager>,
}

impl Provider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }
    fn functions(&self) -> FunctionManager {
        self.functions.clone()
    }
    fn endpoints(&self) -> EndpointManager {
        self.endpoints.clone()
    }
}
