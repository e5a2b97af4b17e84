use chrono::Utc;

use super::{DeployedFunction, LocalPlatform, PlatformState};
use crate::v1::{
    descriptor::function::FunctionResource,
    manager::{ManagerError, ResourceManager},
    provider::FunctionOutput,
};

pub struct LocalFunctionManager {
    platform: LocalPlatform,
}

impl LocalFunctionManager {
    pub fn new(platform: LocalPlatform) -> Self {
        Self { platform }
    }

    fn lookup_by_name(&self, function_name: &str) -> Result<Option<FunctionOutput>, ManagerError> {
        Ok(self
            .platform
            .state()?
            .functions
            .get(function_name)
            .map(|f| f.output.clone()))
    }

    fn ensure_code(state: &PlatformState, input: &FunctionResource) -> Result<(), String> {
        if state.code.contains_key(&input.entry) {
            Ok(())
        } else {
            Err(format!(
                "No code bundle for entry point {} of Function[{}]",
                input.entry, input.id
            ))
        }
    }

    fn output(&self, input: &FunctionResource, version: u64) -> FunctionOutput {
        FunctionOutput {
            function_name: input.id.clone(),
            function_arn: self.platform.function_arn(&input.id),
            runtime: input.runtime,
            handler: input.entry.to_string(),
            memory_size: input.memory_size,
            timeout_secs: input.timeout_secs,
            version,
            last_modified: Utc::now(),
        }
    }
}

impl ResourceManager<FunctionResource, FunctionOutput> for LocalFunctionManager {
    fn lookup(&self, latest: &FunctionOutput) -> Result<Option<FunctionOutput>, ManagerError> {
        self.lookup_by_name(&latest.function_name)
    }

    fn lookup_by_input(
        &self,
        input: &FunctionResource,
    ) -> Result<Option<FunctionOutput>, ManagerError> {
        self.lookup_by_name(&input.id)
    }

    fn create(&self, input: &mut FunctionResource) -> Result<FunctionOutput, ManagerError> {
        let mut state = self.platform.state()?;
        Self::ensure_code(&state, input).map_err(ManagerError::CreateFail)?;
        let output = self.output(input, 1);
        tracing::info!("Create Function[{}] as {}", input.id, output.function_arn);
        state.functions.insert(
            input.id.clone(),
            DeployedFunction {
                output: output.clone(),
                entry: input.entry.clone(),
            },
        );
        Ok(output)
    }

    fn delete(&self, latest: &FunctionOutput) -> Result<bool, ManagerError> {
        let mut state = self.platform.state()?;
        tracing::info!("Delete Function[{}]", latest.function_name);
        Ok(state.functions.remove(&latest.function_name).is_some())
    }

    fn syncup(
        &self,
        latest: &FunctionOutput,
        input: &mut FunctionResource,
    ) -> Result<Option<FunctionOutput>, ManagerError> {
        if latest.function_name != input.id {
            return Err(ManagerError::CannotSyncWithoutRecreate(format!(
                "Function[{}] cannot be renamed to {}",
                latest.function_name, input.id
            )));
        }
        let mut state = self.platform.state()?;
        Self::ensure_code(&state, input).map_err(ManagerError::UpdateFail)?;
        let deployed = state
            .functions
            .get_mut(&input.id)
            .ok_or_else(|| ManagerError::UpdateFail(format!("Function[{}] vanished", input.id)))?;
        let unchanged = deployed.entry == input.entry
            && deployed.output.runtime == input.runtime
            && deployed.output.memory_size == input.memory_size
            && deployed.output.timeout_secs == input.timeout_secs;
        if unchanged {
            return Ok(None);
        }
        tracing::info!("Update Function[{}] configuration", input.id);
        deployed.output = self.output(input, deployed.output.version + 1);
        deployed.entry = input.entry.clone();
        Ok(Some(deployed.output.clone()))
    }
}
