use strum_macros::{Display, EnumString};

use super::{
    datastore::{Datastore, DatastoreError},
    descriptor::DeploymentDescriptor,
    plan::{ApplyReport, Plan, PlanError},
    provider::Provider,
    resource::StoredResource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentStatus {
    Unapplied,
    Applied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackStatus {
    pub status: DeploymentStatus,
    pub resources: Vec<StoredResource>,
}

/// A descriptor bound to a provider and to the state of its last apply.
pub struct Cloud<P: Provider> {
    plan: Plan,
    datastore: Datastore,
    provider: P,
}

impl<P: Provider> Cloud<P> {
    pub fn new(
        descriptor: DeploymentDescriptor,
        datastore: Datastore,
        provider: P,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            plan: Plan::new(descriptor).map_err(CloudError::PlanError)?,
            datastore,
            provider,
        })
    }

    pub fn descriptor(&self) -> &DeploymentDescriptor {
        self.plan.descriptor()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn apply(&mut self) -> Result<ApplyReport, CloudError> {
        self.datastore
            .reload()
            .map_err(CloudError::DatastoreError)?;
        let result = self
            .plan
            .apply(&mut self.datastore, &self.provider)
            .map_err(CloudError::PlanError);
        self.datastore.save().map_err(CloudError::DatastoreError)?;
        result
    }

    pub fn destroy(&mut self) -> Result<Vec<String>, CloudError> {
        self.datastore
            .reload()
            .map_err(CloudError::DatastoreError)?;
        let result = self
            .plan
            .destroy(&mut self.datastore, &self.provider)
            .map_err(CloudError::PlanError);
        self.datastore.save().map_err(CloudError::DatastoreError)?;
        result
    }

    /// Applied once every declared resource has a recorded output. A
    /// descriptor that declares nothing is never applied.
    pub fn status(&mut self) -> Result<StackStatus, CloudError> {
        self.datastore
            .reload()
            .map_err(CloudError::DatastoreError)?;
        let resources = self.datastore.all().map_err(CloudError::DatastoreError)?;
        let ids = self.descriptor().ids();
        let applied = !ids.is_empty() && ids.iter().all(|id| {
            resources
                .iter()
                .any(|r| r.id() == id.as_str() && r.is_applied())
        });
        Ok(StackStatus {
            status: if applied {
                DeploymentStatus::Applied
            } else {
                DeploymentStatus::Unapplied
            },
            resources,
        })
    }
}

#[derive(Debug)]
pub enum CloudError {
    DatastoreError(DatastoreError),
    PlanError(PlanError),
}

impl std::fmt::Display for CloudError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CloudError::PlanError(e) => write!(f, "PlanError: {}", e),
            CloudError::DatastoreError(e) => write!(f, "DatastoreError: {}", e),
        }
    }
}

impl std::error::Error for CloudError {}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::v1::handler::recorder::SilentRecorder;
    use crate::v1::local::{LocalPlatform, LocalProvider};
    use crate::v1::solutions::hello::{hello_platform, hello_stack, ENDPOINT_ID, FUNCTION_ID};
    use crate::v1::storage::memory::MemoryStorage;

    fn cloud(storage: MemoryStorage, platform: &LocalPlatform) -> Cloud<LocalProvider> {
        Cloud::new(
            hello_stack().unwrap(),
            Datastore::new(storage),
            platform.provider(),
        )
        .unwrap()
    }

    #[test]
    fn status_follows_apply_and_destroy() {
        let storage = MemoryStorage::default();
        let platform = hello_platform(std::sync::Arc::new(SilentRecorder));
        let mut cloud = cloud(storage.clone(), &platform);

        assert_eq!(cloud.status().unwrap().status, DeploymentStatus::Unapplied);

        let report = cloud.apply().unwrap();
        assert_eq!(report.applied, vec![FUNCTION_ID, ENDPOINT_ID]);
        let status = cloud.status().unwrap();
        assert_eq!(status.status, DeploymentStatus::Applied);
        assert_eq!(status.resources.len(), 2);

        assert_eq!(cloud.destroy().unwrap(), vec![ENDPOINT_ID, FUNCTION_ID]);
        let status = cloud.status().unwrap();
        assert_eq!(status.status, DeploymentStatus::Unapplied);
        assert!(status.resources.is_empty());
    }

    #[test]
    fn state_survives_a_new_cloud_on_the_same_storage() {
        let storage = MemoryStorage::default();
        let platform = hello_platform(std::sync::Arc::new(SilentRecorder));
        cloud(storage.clone(), &platform).apply().unwrap();

        let mut again = cloud(storage, &platform);
        assert_eq!(again.status().unwrap().status, DeploymentStatus::Applied);
        again.apply().unwrap();
        assert_eq!(platform.endpoint_count(), 1);
    }

    #[test]
    fn apply_without_code_leaves_the_stack_unapplied() {
        let storage = MemoryStorage::default();
        let platform = LocalPlatform::default();
        let mut cloud = cloud(storage, &platform);

        assert!(matches!(cloud.apply(), Err(CloudError::PlanError(_))));
        assert_eq!(cloud.status().unwrap().status, DeploymentStatus::Unapplied);
    }

    #[test]
    fn empty_descriptor_is_never_applied() {
        let platform = LocalPlatform::default();
        let mut cloud = Cloud::new(
            DeploymentDescriptor::new("empty"),
            Datastore::new(MemoryStorage::default()),
            platform.provider(),
        )
        .unwrap();

        let report = cloud.apply().unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(cloud.status().unwrap().status, DeploymentStatus::Unapplied);
    }

    #[test]
    fn status_names_are_lowercase() {
        assert_eq!(DeploymentStatus::Applied.to_string(), "applied");
        assert_eq!(
            DeploymentStatus::from_str("unapplied").unwrap(),
            DeploymentStatus::Unapplied
        );
    }
}
