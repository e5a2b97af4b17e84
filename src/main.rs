use std::{env, sync::Arc};

use anyhow::{anyhow, Context};
use hello_stack::{prelude::*, v1::telemetry::init_tracing};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    init_tracing();
    if args.len() < 2 {
        print_usage(&args[0]);
        return Err(anyhow!("No arguments has been provided"));
    }
    let settings = Settings::from_env();
    let descriptor = settings
        .load_descriptor()
        .context("Could not load the deployment descriptor")?;
    match args[1].as_str() {
        "synth" => {
            println!("{}", descriptor.to_json()?);
            Ok(())
        }
        "apply" => {
            let report = create_cloud(&settings, descriptor)?
                .apply()
                .context("Could not apply the deployment")?;
            for id in report.removed {
                println!("removed  {}", id);
            }
            for id in report.applied {
                println!("applied  {}", id);
            }
            Ok(())
        }
        "destroy" => {
            let removed = create_cloud(&settings, descriptor)?
                .destroy()
                .context("Could not destroy the deployment")?;
            for id in removed {
                println!("removed  {}", id);
            }
            Ok(())
        }
        "status" => {
            let status = create_cloud(&settings, descriptor)?
                .status()
                .context("Could not read the deployment state")?;
            println!("{}", status.status);
            for resource in status.resources {
                match resource {
                    StoredResource::Function(r) => {
                        println!("{:<10} {}", r.kind, serde_json::to_string(&r.output)?)
                    }
                    StoredResource::Endpoint(r) => {
                        println!("{:<10} {}", r.kind, serde_json::to_string(&r.output)?)
                    }
                }
            }
            Ok(())
        }
        "invoke" => {
            if args.len() < 4 {
                print_usage(&args[0]);
                return Err(anyhow!("invoke needs a method and a path"));
            }
            let mut request = GatewayRequest::new(&args[2], &args[3]);
            if let Some(body) = args.get(4) {
                request = request.body(body);
            }
            if let Ok(key) = env::var("HELLO_STACK_API_KEY") {
                request = request.header(API_KEY_HEADER, key);
            }
            let response = invoke(descriptor, request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        other => {
            print_usage(&args[0]);
            Err(anyhow!("Invalid command: {}", other))
        }
    }
}

fn print_usage(cmd: &str) {
    println!("Usage: {} <command>", cmd);
    println!("Commands:");
    println!("  synth                          Print the deployment descriptor");
    println!("  apply                          Apply the deployment");
    println!("  destroy                        Destroy the deployment");
    println!("  status                         Show what the last apply recorded");
    println!("  invoke <METHOD> <PATH> [BODY]  Send one request through a fresh local deployment");
}

fn create_cloud(
    settings: &Settings,
    descriptor: DeploymentDescriptor,
) -> anyhow::Result<Cloud<LocalProvider>> {
    let platform = hello_platform(Arc::new(TracingRecorder));
    let datastore = Datastore::new(FileStorage::new(settings.state_file.clone()));
    Cloud::new(descriptor, datastore, platform.provider()).context("Could not build the plan")
}

fn invoke(
    descriptor: DeploymentDescriptor,
    request: GatewayRequest,
) -> anyhow::Result<OutgoingResponse> {
    let endpoint = descriptor
        .ids()
        .into_iter()
        .find(|id| descriptor.endpoint(id).is_some())
        .ok_or_else(|| anyhow!("The descriptor declares no endpoint"))?;
    let platform = hello_platform(Arc::new(TracingRecorder));
    let mut cloud = Cloud::new(
        descriptor,
        Datastore::new(MemoryStorage::default()),
        platform.provider(),
    )?;
    cloud.apply().context("Could not apply the deployment")?;
    let api = platform
        .endpoint_by_name(&endpoint)
        .ok_or_else(|| anyhow!("Endpoint {} was not deployed", endpoint))?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(platform.invoke(&api.api_id, request))
        .context("Could not route the request")
}
