pub mod v1;

pub mod prelude {
    pub use crate::v1::cloud::*;
    pub use crate::v1::config::Settings;
    pub use crate::v1::datastore::{Datastore, DatastoreError, Storage};
    pub use crate::v1::descriptor::{
        endpoint::{AccessPolicy, EndpointResource, Integration},
        function::{BundlingConfig, EntryPoint, FunctionResource, Runtime, SourceMapMode},
        *,
    };
    pub use crate::v1::handler::{
        recorder::{EventRecorder, MemoryRecorder, SilentRecorder, TracingRecorder},
        *,
    };
    pub use crate::v1::local::{
        gateway::{GatewayError, GatewayRequest, API_KEY_HEADER},
        LocalPlatform, LocalProvider,
    };
    pub use crate::v1::plan::*;
    pub use crate::v1::provider::*;
    pub use crate::v1::resource::*;
    pub use crate::v1::solutions::hello::*;
    pub use crate::v1::storage::{file::FileStorage, memory::MemoryStorage};
}
