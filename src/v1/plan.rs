use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use super::{
    datastore::{Datastore, DatastoreError},
    descriptor::{sort_by_dependencies, DeploymentDescriptor, DescriptorError, ResourceSpec},
    provider::{EndpointInput, FunctionOutput, Provider},
    resource::{Resource, ResourceError, StoredResource},
};

/// What one `apply` changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub removed: Vec<String>,
}

/// Walks a validated descriptor against a provider, recording every applied
/// resource in the datastore.
#[derive(Debug, Clone)]
pub struct Plan {
    descriptor: DeploymentDescriptor,
}

impl Plan {
    pub fn new(descriptor: DeploymentDescriptor) -> Result<Self, PlanError> {
        descriptor.validate()?;
        tracing::info!("Creating plan for {}", descriptor.name);
        Ok(Self { descriptor })
    }

    pub fn descriptor(&self) -> &DeploymentDescriptor {
        &self.descriptor
    }

    pub fn apply(
        &self,
        datastore: &mut Datastore,
        provider: &dyn Provider,
    ) -> Result<ApplyReport, PlanError> {
        tracing::info!("Applying plan {} on {}", self.descriptor.name, provider.name());
        let sorted = self.descriptor.apply_order()?;
        let removed = self.remove_undeclared(datastore, provider)?;
        let applied = self.apply_present(datastore, provider, &sorted)?;
        Ok(ApplyReport { applied, removed })
    }

    /// Tears down everything the datastore knows about, dependents first.
    pub fn destroy(
        &self,
        datastore: &mut Datastore,
        provider: &dyn Provider,
    ) -> Result<Vec<String>, PlanError> {
        tracing::info!("Destroying plan {} on {}", self.descriptor.name, provider.name());
        self.delete_ids(datastore.keys(), datastore, provider)
    }

    fn apply_present(
        &self,
        datastore: &mut Datastore,
        provider: &dyn Provider,
        sorted: &[String],
    ) -> Result<Vec<String>, PlanError> {
        tracing::info!("Ensuring resources are present");
        let mut functions = HashMap::<String, FunctionOutput>::new();
        for id in sorted {
            let spec = self
                .descriptor
                .resource(id)
                .ok_or_else(|| DescriptorError::UnknownResource(id.clone()))?;
            let latest = datastore.get(id)?;
            let dependencies = self.descriptor.dependencies(id);
            let stored = match spec {
                ResourceSpec::Function(function) => {
                    let latest = latest.as_ref().and_then(StoredResource::function_output);
                    let mut record =
                        Resource::new(spec.kind(), id, function.clone(), dependencies);
                    let output = record.ensure_present(provider.functions().as_ref(), latest)?;
                    functions.insert(id.clone(), output.clone());
                    StoredResource::Function(record)
                }
                ResourceSpec::Endpoint(endpoint) => {
                    let function = functions.get(&endpoint.handler).ok_or_else(|| {
                        ResourceError::DependencyOutputIsMissing(format!(
                            "Endpoint[{}] needs Function[{}] applied first",
                            id, endpoint.handler
                        ))
                    })?;
                    let mut input = EndpointInput::new(endpoint.clone());
                    input.bind_function(function);
                    tracing::info!("Resource[{}].output to Resource[{}].input is bound", endpoint.handler, id);
                    let latest = latest.as_ref().and_then(StoredResource::endpoint_output);
                    let mut record = Resource::new(spec.kind(), id, input, dependencies);
                    record.ensure_present(provider.endpoints().as_ref(), latest)?;
                    StoredResource::Endpoint(record)
                }
            };
            datastore.insert_resource(&stored)?;
        }
        Ok(sorted.to_vec())
    }

    /// Recorded resources the descriptor no longer declares, or declares with
    /// a different kind, are deleted before anything is created.
    fn remove_undeclared(
        &self,
        datastore: &mut Datastore,
        provider: &dyn Provider,
    ) -> Result<Vec<String>, PlanError> {
        tracing::info!("Ensuring undeclared resources are absent");
        let mut stale = vec![];
        for record in datastore.all()? {
            let declared = self
                .descriptor
                .resource(record.id())
                .map(|spec| spec.kind() == record.kind())
                .unwrap_or(false);
            if !declared {
                stale.push(record.id().to_string());
            }
        }
        self.delete_ids(stale, datastore, provider)
    }

    fn delete_ids(
        &self,
        ids: Vec<String>,
        datastore: &mut Datastore,
        provider: &dyn Provider,
    ) -> Result<Vec<String>, PlanError> {
        let mut records = HashMap::new();
        for id in ids {
            if let Some(record) = datastore.get(&id)? {
                records.insert(id, record);
            }
        }
        let items: Vec<(String, BTreeSet<String>)> = records
            .values()
            .map(|r| (r.id().to_string(), r.dependencies().clone()))
            .collect();
        let mut sorted = sort_by_dependencies(&items)?;
        sorted.reverse();
        for id in &sorted {
            if let Some(record) = records.get(id) {
                record.ensure_absent(provider)?;
            }
            datastore.remove(id);
        }
        Ok(sorted)
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Descriptor error: {0}")]
    DescriptorError(#[from] DescriptorError),
    #[error("Resource error: {0}")]
    ResourceError(#[from] ResourceError),
    #[error("Datastore error: {0}")]
    DatastoreError(#[from] DatastoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::descriptor::endpoint::EndpointResource;
    use crate::v1::descriptor::function::{EntryPoint, FunctionResource};
    use crate::v1::handler::{recorder::SilentRecorder, RequestHandler};
    use crate::v1::local::LocalPlatform;
    use crate::v1::storage::memory::MemoryStorage;

    fn descriptor() -> DeploymentDescriptor {
        let mut d = DeploymentDescriptor::new("plan-test");
        d.add_function(FunctionResource::new("Fn", EntryPoint::new("hello", "handler")))
            .unwrap();
        d.add_endpoint(EndpointResource::new("Api", "Fn")).unwrap();
        d
    }

    fn platform() -> LocalPlatform {
        LocalPlatform::default().with_code(
            EntryPoint::new("hello", "handler"),
            RequestHandler::new(SilentRecorder),
        )
    }

    #[test]
    fn apply_records_function_then_endpoint() {
        let platform = platform();
        let mut datastore = Datastore::new(MemoryStorage::default());
        let plan = Plan::new(descriptor()).unwrap();

        let report = plan.apply(&mut datastore, &platform.provider()).unwrap();

        assert_eq!(report.applied, vec!["Fn", "Api"]);
        assert!(report.removed.is_empty());
        let function = datastore.get("Fn").unwrap().unwrap();
        let endpoint = datastore.get("Api").unwrap().unwrap();
        assert_eq!(
            endpoint.endpoint_output().unwrap().function_arn,
            function.function_output().unwrap().function_arn
        );
        assert_eq!(
            endpoint.dependencies().iter().collect::<Vec<_>>(),
            vec!["Fn"]
        );
    }

    #[test]
    fn reapplying_keeps_the_same_resources() {
        let platform = platform();
        let mut datastore = Datastore::new(MemoryStorage::default());
        let plan = Plan::new(descriptor()).unwrap();

        plan.apply(&mut datastore, &platform.provider()).unwrap();
        let first = datastore.get("Api").unwrap().unwrap();
        plan.apply(&mut datastore, &platform.provider()).unwrap();
        let second = datastore.get("Api").unwrap().unwrap();

        assert_eq!(
            first.endpoint_output().unwrap().api_id,
            second.endpoint_output().unwrap().api_id
        );
        assert_eq!(platform.function_count(), 1);
        assert_eq!(platform.endpoint_count(), 1);
    }

    #[test]
    fn destroy_removes_everything_dependents_first() {
        let platform = platform();
        let mut datastore = Datastore::new(MemoryStorage::default());
        let plan = Plan::new(descriptor()).unwrap();
        plan.apply(&mut datastore, &platform.provider()).unwrap();

        let removed = plan.destroy(&mut datastore, &platform.provider()).unwrap();

        assert_eq!(removed, vec!["Api", "Fn"]);
        assert!(datastore.is_empty());
        assert_eq!(platform.function_count(), 0);
        assert_eq!(platform.endpoint_count(), 0);
    }

    #[test]
    fn resources_dropped_from_the_descriptor_are_removed() {
        let platform = platform();
        let mut datastore = Datastore::new(MemoryStorage::default());
        Plan::new(descriptor())
            .unwrap()
            .apply(&mut datastore, &platform.provider())
            .unwrap();

        let mut smaller = DeploymentDescriptor::new("plan-test");
        smaller
            .add_function(FunctionResource::new("Fn", EntryPoint::new("hello", "handler")))
            .unwrap();
        let report = Plan::new(smaller)
            .unwrap()
            .apply(&mut datastore, &platform.provider())
            .unwrap();

        assert_eq!(report.removed, vec!["Api"]);
        assert_eq!(report.applied, vec!["Fn"]);
        assert!(!datastore.contains("Api"));
        assert_eq!(platform.endpoint_count(), 0);
    }

    #[test]
    fn function_without_code_fails_the_apply() {
        let platform = platform();
        let mut datastore = Datastore::new(MemoryStorage::default());
        let mut d = DeploymentDescriptor::new("no-code");
        d.add_function(FunctionResource::new("Fn", EntryPoint::new("missing", "handler")))
            .unwrap();

        let err = Plan::new(d)
            .unwrap()
            .apply(&mut datastore, &platform.provider())
            .unwrap_err();

        assert!(matches!(err, PlanError::ResourceError(ResourceError::ManagerError(..))));
        assert!(!datastore.contains("Fn"));
    }

    #[test]
    fn invalid_descriptors_never_become_plans() {
        let mut d = descriptor();
        d.resources.push(ResourceSpec::Endpoint(EndpointResource::new("Api", "Fn")));
        assert!(matches!(
            Plan::new(d),
            Err(PlanError::DescriptorError(DescriptorError::DuplicateResource(_)))
        ));
    }
}
