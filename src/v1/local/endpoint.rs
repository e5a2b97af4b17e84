use super::{DeployedApi, LocalPlatform, PlatformState};
use crate::v1::{
    descriptor::endpoint::{ANY_METHOD, PROXY_RESOURCE},
    manager::{ManagerError, ResourceManager},
    provider::{EndpointInput, EndpointOutput},
};

pub struct LocalEndpointManager {
    platform: LocalPlatform,
}

impl LocalEndpointManager {
    pub fn new(platform: LocalPlatform) -> Self {
        Self { platform }
    }

    fn lookup_by_id(&self, api_id: &str) -> Result<Option<EndpointOutput>, ManagerError> {
        Ok(self
            .platform
            .state()?
            .apis
            .get(api_id)
            .map(|api| api.output.clone()))
    }

    fn lookup_by_name(&self, name: &str) -> Result<Option<EndpointOutput>, ManagerError> {
        Ok(self
            .platform
            .state()?
            .apis
            .values()
            .find(|api| api.output.name == name)
            .map(|api| api.output.clone()))
    }

    fn bound_function(state: &PlatformState, input: &EndpointInput) -> Result<String, String> {
        let arn = input
            .function_arn
            .clone()
            .ok_or_else(|| format!("Endpoint[{}] is not bound to a function", input.endpoint.id))?;
        if state.functions.values().any(|f| f.output.function_arn == arn) {
            Ok(arn)
        } else {
            Err(format!(
                "Endpoint[{}] is bound to unknown function {}",
                input.endpoint.id, arn
            ))
        }
    }

    fn output(&self, api_id: &str, input: &EndpointInput, function_arn: String) -> EndpointOutput {
        EndpointOutput {
            name: input.endpoint.id.clone(),
            api_id: api_id.to_string(),
            stage_name: input.endpoint.stage_name.clone(),
            url: format!(
                "https://{}.execute-api.{}.localhost/{}/",
                api_id,
                self.platform.region(),
                input.endpoint.stage_name
            ),
            resource_path: PROXY_RESOURCE.to_string(),
            http_method: ANY_METHOD.to_string(),
            function_arn,
        }
    }
}

impl ResourceManager<EndpointInput, EndpointOutput> for LocalEndpointManager {
    fn lookup(&self, latest: &EndpointOutput) -> Result<Option<EndpointOutput>, ManagerError> {
        self.lookup_by_id(&latest.api_id)
    }

    fn lookup_by_input(
        &self,
        input: &EndpointInput,
    ) -> Result<Option<EndpointOutput>, ManagerError> {
        self.lookup_by_name(&input.endpoint.id)
    }

    fn create(&self, input: &mut EndpointInput) -> Result<EndpointOutput, ManagerError> {
        let mut state = self.platform.state()?;
        let function_arn = Self::bound_function(&state, input).map_err(ManagerError::CreateFail)?;
        state.next_api += 1;
        let api_id = format!("api{:07}", state.next_api);
        let output = self.output(&api_id, input, function_arn);
        tracing::info!(
            "Create Endpoint[{}] at {} forwarding {} {} to {}",
            input.endpoint.id,
            output.url,
            output.http_method,
            output.resource_path,
            output.function_arn
        );
        state.apis.insert(
            api_id,
            DeployedApi {
                output: output.clone(),
                access: input.endpoint.access.clone(),
            },
        );
        Ok(output)
    }

    fn delete(&self, latest: &EndpointOutput) -> Result<bool, ManagerError> {
        let mut state = self.platform.state()?;
        tracing::info!("Delete Endpoint[{}] ({})", latest.name, latest.api_id);
        Ok(state.apis.remove(&latest.api_id).is_some())
    }

    fn syncup(
        &self,
        latest: &EndpointOutput,
        input: &mut EndpointInput,
    ) -> Result<Option<EndpointOutput>, ManagerError> {
        let mut state = self.platform.state()?;
        let function_arn = Self::bound_function(&state, input).map_err(ManagerError::UpdateFail)?;
        let output = self.output(&latest.api_id, input, function_arn);
        let api = state.apis.get_mut(&latest.api_id).ok_or_else(|| {
            ManagerError::UpdateFail(format!("Endpoint[{}] vanished", latest.name))
        })?;
        if api.output == output && api.access == input.endpoint.access {
            return Ok(None);
        }
        tracing::info!("Update Endpoint[{}]", input.endpoint.id);
        api.output = output.clone();
        api.access = input.endpoint.access.clone();
        Ok(Some(output))
    }
}
