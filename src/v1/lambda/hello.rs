use hello_stack::v1::{
    handler::{recorder::TracingRecorder, IncomingRequest, OutgoingResponse, RequestHandler},
    telemetry::init_tracing,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let handler = RequestHandler::new(TracingRecorder);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<IncomingRequest>| {
        let handler = handler.clone();
        async move { Ok::<OutgoingResponse, Error>(handler.handle(event.payload).await) }
    }))
    .await
}
