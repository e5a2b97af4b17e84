use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    descriptor::{function::FunctionResource, ResourceKind},
    manager::{ManagerError, ResourceManager},
    provider::{EndpointInput, EndpointOutput, FunctionOutput, Provider},
};

/// One resource as the plan recorded it: what was asked for, what came back.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Resource<Input, Output> {
    pub kind: ResourceKind,
    pub id: String,
    pub input: Input,
    pub output: Option<Output>,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl<Input: Clone, Output: Clone> Resource<Input, Output> {
    pub fn new(
        kind: ResourceKind,
        id: impl ToString,
        input: Input,
        dependencies: BTreeSet<String>,
    ) -> Self {
        let id = id.to_string();
        tracing::debug!("New Resource[{}]", id);
        Self {
            kind,
            id,
            input,
            output: None,
            dependencies,
        }
    }

    pub fn ensure_present(
        &mut self,
        manager: &dyn ResourceManager<Input, Output>,
        latest: Option<&Output>,
    ) -> Result<&Output, ResourceError> {
        tracing::info!("Ensuring Resource[{}] is present", self.id);
        let output = manager
            .ensure_present(latest, &mut self.input)
            .map_err(|err| ResourceError::ManagerError(self.id.clone(), err))?;
        tracing::info!("Resource[{}] is present", self.id);
        Ok(self.output.insert(output))
    }

    pub fn ensure_absent(
        &self,
        manager: &dyn ResourceManager<Input, Output>,
    ) -> Result<bool, ResourceError> {
        let output = match self.output.as_ref() {
            Some(output) => output,
            None => return Ok(false),
        };
        tracing::info!("Ensuring Resource[{}] is absent", self.id);
        manager
            .ensure_absent(output)
            .map_err(|err| ResourceError::ManagerError(self.id.clone(), err))
            .inspect(|_| tracing::info!("Resource[{}] is absent", self.id))
    }
}

pub type FunctionRecord = Resource<FunctionResource, FunctionOutput>;
pub type EndpointRecord = Resource<EndpointInput, EndpointOutput>;

/// Datastore entry, tagged so it can be read back without knowing its kind.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "kind", content = "resource")]
pub enum StoredResource {
    Function(FunctionRecord),
    Endpoint(EndpointRecord),
}

impl StoredResource {
    pub fn id(&self) -> &str {
        match self {
            StoredResource::Function(r) => &r.id,
            StoredResource::Endpoint(r) => &r.id,
        }
    }
    pub fn kind(&self) -> ResourceKind {
        match self {
            StoredResource::Function(r) => r.kind,
            StoredResource::Endpoint(r) => r.kind,
        }
    }
    pub fn dependencies(&self) -> &BTreeSet<String> {
        match self {
            StoredResource::Function(r) => &r.dependencies,
            StoredResource::Endpoint(r) => &r.dependencies,
        }
    }
    pub fn is_applied(&self) -> bool {
        match self {
            StoredResource::Function(r) => r.output.is_some(),
            StoredResource::Endpoint(r) => r.output.is_some(),
        }
    }
    pub fn function_output(&self) -> Option<&FunctionOutput> {
        match self {
            StoredResource::Function(r) => r.output.as_ref(),
            StoredResource::Endpoint(_) => None,
        }
    }
    pub fn endpoint_output(&self) -> Option<&EndpointOutput> {
        match self {
            StoredResource::Endpoint(r) => r.output.as_ref(),
            StoredResource::Function(_) => None,
        }
    }
    pub fn ensure_absent(&self, provider: &dyn Provider) -> Result<bool, ResourceError> {
        match self {
            StoredResource::Function(r) => r.ensure_absent(provider.functions().as_ref()),
            StoredResource::Endpoint(r) => r.ensure_absent(provider.endpoints().as_ref()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("DependencyOutputIsMissing: {0}")]
    DependencyOutputIsMissing(String),
    #[error("Resource[{0}] manager error: {1}")]
    ManagerError(String, ManagerError),
}
