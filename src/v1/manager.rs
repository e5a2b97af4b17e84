use thiserror::Error;

/// Talks to one platform about one kind of resource.
///
/// `Input` is what the descriptor asks for, `Output` is what the platform
/// reports back once the resource exists.
pub trait ResourceManager<Input, Output>: Send + Sync {
    fn lookup(&self, latest: &Output) -> Result<Option<Output>, ManagerError>;
    fn lookup_by_input(&self, input: &Input) -> Result<Option<Output>, ManagerError>;
    fn create(&self, input: &mut Input) -> Result<Output, ManagerError>;
    fn delete(&self, latest: &Output) -> Result<bool, ManagerError>;
    fn syncup(&self, latest: &Output, input: &mut Input) -> Result<Option<Output>, ManagerError>;
    fn ensure_absent(&self, latest: &Output) -> Result<bool, ManagerError> {
        match self.lookup(latest) {
            Ok(Some(_)) => self.delete(latest),
            Ok(None) => Ok(false),
            Err(err) => Err(err),
        }
    }
    fn ensure_present(
        &self,
        latest: Option<&Output>,
        input: &mut Input,
    ) -> Result<Output, ManagerError> {
        let latest = match latest {
            Some(latest) => self.lookup(latest)?,
            None => None,
        };
        let actual = self.lookup_by_input(input)?;
        match actual.or(latest) {
            Some(output) => self
                .syncup(&output, input)
                .map(|synced| synced.unwrap_or(output)),
            None => self.create(input),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    #[error("DeleteFail: {0}")]
    DeleteFail(String),
    #[error("CreateFail: {0}")]
    CreateFail(String),
    #[error("UpdateFail: {0}")]
    UpdateFail(String),
    #[error("LookupFail: {0}")]
    LookupFail(String),
    #[error("CannotSyncWithoutRecreate: {0}")]
    CannotSyncWithoutRecreate(String),
}
