use serde::{Deserialize, Serialize};

pub const DEFAULT_STAGE: &str = "prod";
pub const PROXY_RESOURCE: &str = "/{proxy+}";
pub const ANY_METHOD: &str = "ANY";

/// How the endpoint hands requests to its function. Only the catch-all proxy
/// exists: every path and every method go to the one function.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Integration {
    #[default]
    Proxy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AccessPolicy {
    #[default]
    Open,
    ApiKey { key: String },
}

impl AccessPolicy {
    pub fn allows(&self, api_key: Option<&str>) -> bool {
        match self {
            AccessPolicy::Open => true,
            AccessPolicy::ApiKey { key } => api_key == Some(key.as_str()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResource {
    pub id: String,
    /// Id of the function every request is forwarded to.
    pub handler: String,
    #[serde(default)]
    pub integration: Integration,
    #[serde(default = "default_stage")]
    pub stage_name: String,
    #[serde(default)]
    pub access: AccessPolicy,
}

fn default_stage() -> String {
    DEFAULT_STAGE.to_string()
}

impl EndpointResource {
    pub fn new(id: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handler: handler.into(),
            integration: Integration::Proxy,
            stage_name: default_stage(),
            access: AccessPolicy::Open,
        }
    }
    pub fn access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    /// Function id serving `method` on `path`.
    pub fn route(&self, _method: &str, _path: &str) -> &str {
        match self.integration {
            Integration::Proxy => &self.handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_and_method_reaches_the_same_function() {
        let endpoint = EndpointResource::new("Api", "Fn");
        for method in ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"] {
            for path in ["/", "/foo", "/foo/bar", "/deeply/nested/unmapped/path"] {
                assert_eq!(endpoint.route(method, path), "Fn");
            }
        }
    }

    #[test]
    fn api_key_policy_only_lets_the_key_through() {
        let policy = AccessPolicy::ApiKey {
            key: "secret".to_string(),
        };
        assert!(policy.allows(Some("secret")));
        assert!(!policy.allows(Some("guess")));
        assert!(!policy.allows(None));
        assert!(AccessPolicy::Open.allows(None));
    }
}
