use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    descriptor::{
        endpoint::EndpointResource,
        function::{FunctionResource, Runtime},
    },
    manager::ResourceManager,
};

pub type FunctionManager = Arc<dyn ResourceManager<FunctionResource, FunctionOutput>>;
pub type EndpointManager = Arc<dyn ResourceManager<EndpointInput, EndpointOutput>>;

/// A platform the plan can provision resources on.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn functions(&self) -> FunctionManager;
    fn endpoints(&self) -> EndpointManager;
}

pub trait ArnProvider {
    fn arn(&self) -> Option<String>;
}

/// What the platform reports for a registered function.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionOutput {
    pub function_name: String,
    pub function_arn: String,
    pub runtime: Runtime,
    pub handler: String,
    pub memory_size: u32,
    pub timeout_secs: u64,
    pub version: u64,
    pub last_modified: DateTime<Utc>,
}

impl ArnProvider for FunctionOutput {
    fn arn(&self) -> Option<String> {
        Some(self.function_arn.clone())
    }
}

/// The endpoint as declared, plus the function it ends up bound to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointInput {
    pub endpoint: EndpointResource,
    pub function_arn: Option<String>,
}

impl EndpointInput {
    pub fn new(endpoint: EndpointResource) -> Self {
        Self {
            endpoint,
            function_arn: None,
        }
    }
    pub fn bind_function(&mut self, function: &impl ArnProvider) {
        self.function_arn = function.arn();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointOutput {
    pub name: String,
    pub api_id: String,
    pub stage_name: String,
    pub url: String,
    pub resource_path: String,
    pub http_method: String,
    pub function_arn: String,
}

impl ArnProvider for EndpointOutput {
    fn arn(&self) -> Option<String> {
        Some(format!("{}/{}", self.api_id, self.stage_name))
    }
}
