use std::sync::Arc;

use anyhow::Context;

use crate::prelude::*;

pub const STACK_NAME: &str = "HelloStack";
pub const FUNCTION_ID: &str = "HelloHandler";
pub const ENDPOINT_ID: &str = "HelloAPI";

pub fn hello_entry_point() -> EntryPoint {
    EntryPoint::new("hello", "handler")
}

/// One function behind one catch-all endpoint.
///
/// The function ships as a `provided.al2023` binary. The bundling block only
/// applies to `nodejs*` runtimes and is carried here as declarative data.
pub fn hello_stack() -> anyhow::Result<DeploymentDescriptor> {
    let mut stack = DeploymentDescriptor::new(STACK_NAME);
    let function = stack
        .add_function(
            FunctionResource::new(FUNCTION_ID, hello_entry_point())
                .runtime(Runtime::ProvidedAl2023)
                .bundling(BundlingConfig {
                    minify: true,
                    source_map: true,
                    source_map_mode: SourceMapMode::Inline,
                    sources_content: false,
                    target: Some("esnext".to_string()),
                }),
        )
        .context("Fail to declare the hello function")?;
    stack
        .add_endpoint(EndpointResource::new(ENDPOINT_ID, function))
        .context("Fail to declare the hello endpoint")?;
    Ok(stack)
}

/// A local platform that can run the hello function.
pub fn hello_platform(recorder: Arc<dyn EventRecorder>) -> LocalPlatform {
    LocalPlatform::default().with_code(
        hello_entry_point(),
        RequestHandler::with_shared_recorder(recorder),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_declares_function_and_endpoint() {
        let stack = hello_stack().unwrap();
        assert_eq!(stack.ids(), vec![FUNCTION_ID, ENDPOINT_ID]);
        assert_eq!(stack.apply_order().unwrap(), vec![FUNCTION_ID, ENDPOINT_ID]);

        let function = stack.function(FUNCTION_ID).unwrap();
        assert_eq!(function.entry.to_string(), "hello.handler");
        assert_eq!(function.runtime, Runtime::ProvidedAl2023);
        assert_eq!(function.bundling.target.as_deref(), Some("esnext"));
        assert!(function.bundling.minify);
        assert_eq!(function.bundling.source_map_mode, SourceMapMode::Inline);
        assert!(!function.bundling.sources_content);

        let endpoint = stack.endpoint(ENDPOINT_ID).unwrap();
        assert_eq!(endpoint.handler, FUNCTION_ID);
        assert_eq!(endpoint.access, AccessPolicy::Open);
    }

    #[test]
    fn stack_synthesizes_to_json() {
        let json: serde_json::Value =
            serde_json::from_str(&hello_stack().unwrap().to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "HelloStack");
        assert_eq!(json["resources"][0]["kind"], "Function");
        assert_eq!(json["resources"][0]["runtime"], "provided.al2023");
        assert_eq!(json["resources"][0]["bundling"]["sourceMapMode"], "inline");
        assert_eq!(json["resources"][1]["kind"], "Endpoint");
        assert_eq!(json["resources"][1]["handler"], "HelloHandler");
    }
}
