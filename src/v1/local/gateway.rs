use std::{collections::BTreeMap, time::Duration};

use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyRequestContext};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::LocalPlatform;
use crate::v1::{
    descriptor::endpoint::PROXY_RESOURCE,
    handler::{IncomingRequest, OutgoingResponse},
};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: String,
    /// Path below the stage, query string included.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl GatewayRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl LocalPlatform {
    /// Routes one request through the endpoint `api_id`.
    ///
    /// The endpoint has no route table: whatever the method or path, the
    /// bound function answers. Platform faults become 5xx responses, the way
    /// a managed gateway reports them.
    pub async fn invoke(
        &self,
        api_id: &str,
        request: GatewayRequest,
    ) -> Result<OutgoingResponse, GatewayError> {
        let (stage, function, code, timeout) = {
            let state = self
                .state
                .lock()
                .map_err(|err| GatewayError::Unavailable(err.to_string()))?;
            let api = state
                .apis
                .get(api_id)
                .ok_or_else(|| GatewayError::EndpointNotFound(api_id.to_string()))?;
            let api_key = request.headers.get(API_KEY_HEADER).map(String::as_str);
            if !api.access.allows(api_key) {
                tracing::warn!("{} {} on {} refused", request.method, request.path, api_id);
                return Ok(OutgoingResponse::json(403, json!({"message": "Forbidden"})));
            }
            let deployed = state
                .functions
                .values()
                .find(|f| f.output.function_arn == api.output.function_arn);
            let code = deployed.and_then(|f| state.code.get(&f.entry).cloned());
            match (deployed, code) {
                (Some(f), Some(code)) => (
                    api.output.stage_name.clone(),
                    f.output.function_name.clone(),
                    code,
                    Duration::from_secs(f.output.timeout_secs),
                ),
                _ => {
                    tracing::error!(
                        "Endpoint {} points at {} which cannot be invoked",
                        api_id,
                        api.output.function_arn
                    );
                    return Ok(internal_server_error());
                }
            }
        };

        tracing::info!("{} {} -> Function[{}]", request.method, request.path, function);
        let event = proxy_event(api_id, &stage, &request)?;
        match tokio::time::timeout(timeout, code.invoke(event)).await {
            Ok(response) => Ok(response),
            Err(_) => {
                tracing::error!("Function[{}] timed out after {:?}", function, timeout);
                Ok(OutgoingResponse::json(
                    504,
                    json!({"message": "Endpoint request timed out"}),
                ))
            }
        }
    }
}

fn internal_server_error() -> OutgoingResponse {
    OutgoingResponse::json(502, json!({"message": "Internal server error"}))
}

/// Builds the event a proxy integration hands to its function.
///
/// Query parameters are form-decoded. `queryStringParameters` keeps the last
/// value of a repeated key and `multiValueQueryStringParameters` keeps them all.
pub fn proxy_event(
    api_id: &str,
    stage: &str,
    request: &GatewayRequest,
) -> Result<IncomingRequest, GatewayError> {
    let (path, query) = match request.path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request.path.as_str(), None),
    };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let resource = if path == "/" { "/" } else { PROXY_RESOURCE };
    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|err| GatewayError::InvalidRequest(format!("{}: {}", request.method, err)))?;
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| GatewayError::InvalidRequest(format!("header {}: {}", name, err)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| GatewayError::InvalidRequest(format!("header {}: {}", name, err)))?;
        headers.insert(name, value);
    }

    let mut context = ApiGatewayProxyRequestContext::default();
    context.apiid = Some(api_id.to_string());
    context.stage = Some(stage.to_string());
    context.resource_path = Some(resource.to_string());
    context.path = Some(format!("/{}{}", stage, path));
    context.http_method = method.clone();

    let mut event = ApiGatewayProxyRequest::default();
    event.resource = Some(resource.to_string());
    if path != "/" {
        event
            .path_parameters
            .insert("proxy".to_string(), path.trim_start_matches('/').to_string());
    }
    event.path = Some(path);
    event.http_method = method;
    event.headers = headers;
    event.request_context = context;
    event.body = request.body.clone();

    let mut transport = match serde_json::to_value(&event) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            return Err(GatewayError::InvalidRequest(format!(
                "proxy event is not an object: {}",
                other
            )))
        }
        Err(err) => return Err(GatewayError::InvalidRequest(err.to_string())),
    };
    let (single, multi) = query_parameters(query);
    transport.insert("queryStringParameters".to_string(), single);
    transport.insert("multiValueQueryStringParameters".to_string(), multi);
    Ok(IncomingRequest {
        message: None,
        transport,
    })
}

fn query_parameters(query: Option<&str>) -> (Value, Value) {
    let mut values = BTreeMap::<String, Vec<String>>::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()).into_owned() {
        values.entry(key).or_default().push(value);
    }
    if values.is_empty() {
        return (Value::Null, Value::Null);
    }
    let single = values
        .iter()
        .filter_map(|(key, all)| all.last().map(|last| (key.clone(), json!(last))))
        .collect::<Map<String, Value>>();
    let multi = values
        .into_iter()
        .map(|(key, all)| (key, json!(all)))
        .collect::<Map<String, Value>>();
    (Value::Object(single), Value::Object(multi))
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No endpoint with id {0}")]
    EndpointNotFound(String),
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
    #[error("Request cannot be forwarded: {0}")]
    InvalidRequest(String),
}
