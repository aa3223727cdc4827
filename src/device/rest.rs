//! HTTP implementation of the device-API collaborator
//!
//! Talks to the management plane's JSON API. Transport and status faults
//! are classified into [`DeviceError`] variants; retry policy lives in the
//! sync engine, not here.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::DeviceConfig;
use crate::error::DeviceError;
use crate::models::{Address, AddressGroup, ConfigObject, ObjectKind};
use crate::scope::Scope;

use super::{DeviceApi, JobStatus};

/// Device-API client over the management plane's JSON API
#[derive(Debug)]
pub struct RestDeviceApi {
    client: Client,
    base_url: String,
    config: DeviceConfig,
}

#[derive(Debug, Deserialize)]
struct EntryList {
    #[serde(default)]
    entries: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    job_id: String,
}

impl RestDeviceApi {
    /// Build a client from the device configuration
    pub fn new(config: &DeviceConfig) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| DeviceError::Api(format!("failed to build HTTP client: {e}")))?;

        // Bare hostnames get the https scheme; full URLs pass through so
        // a plain-HTTP endpoint can be targeted explicitly.
        let base_url = if config.hostname.contains("://") {
            format!("{}/api/v1", config.hostname.trim_end_matches('/'))
        } else {
            format!("https://{}/api/v1", config.hostname)
        };

        Ok(Self {
            client,
            base_url,
            config: config.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.config.api_key {
            Some(key) => builder.header("X-API-Key", key),
            None => builder.basic_auth(&self.config.username, Some(&self.config.password)),
        }
    }

    fn scope_params(scope: &Scope) -> Vec<(&'static str, String)> {
        match scope {
            Scope::Shared => vec![("location", "shared".to_string())],
            Scope::Group(group) => vec![
                ("location", "device-group".to_string()),
                ("device-group", group.name.clone()),
            ],
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, DeviceError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DeviceError::Timeout
            } else if e.is_connect() {
                DeviceError::ConnectionRefused
            } else {
                DeviceError::Api(e.to_string())
            }
        })?;
        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, DeviceError> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                Err(DeviceError::RateLimited(wait))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DeviceError::Unauthorized),
            StatusCode::NOT_FOUND => Err(DeviceError::NotFound),
            s if s.is_server_error() => Err(DeviceError::Server(s.as_u16())),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(DeviceError::Api(format!(
                    "unexpected status {}: {}",
                    s.as_u16(),
                    body
                )))
            }
        }
    }

    /// Build the wire entry for an object
    fn entry_payload(object: &ConfigObject) -> serde_json::Value {
        match object {
            ConfigObject::Address(addr) => {
                let mut entry = json!({ "name": addr.name });
                if let Some((kind, value)) = addr.value() {
                    entry[kind] = json!(value);
                }
                if let Some(desc) = &addr.description {
                    entry["description"] = json!(desc);
                }
                if !addr.tags.is_empty() {
                    entry["tag"] = json!(addr.tags);
                }
                entry
            }
            ConfigObject::Group(group) => {
                let mut entry = json!({ "name": group.name });
                if let Some(members) = &group.static_members {
                    entry["static"] = json!(members);
                }
                if let Some(filter) = &group.dynamic_filter {
                    entry["dynamic"] = json!({ "filter": filter });
                }
                if let Some(desc) = &group.description {
                    entry["description"] = json!(desc);
                }
                if !group.tags.is_empty() {
                    entry["tag"] = json!(group.tags);
                }
                entry
            }
        }
    }

    fn decode_entry(kind: ObjectKind, entry: serde_json::Value) -> Result<ConfigObject, DeviceError> {
        match kind {
            ObjectKind::Address => serde_json::from_value::<Address>(entry)
                .map(ConfigObject::Address)
                .map_err(|e| DeviceError::InvalidResponse(e.to_string())),
            ObjectKind::AddressGroup => serde_json::from_value::<AddressGroup>(entry)
                .map(ConfigObject::Group)
                .map_err(|e| DeviceError::InvalidResponse(e.to_string())),
        }
    }
}

#[async_trait]
impl DeviceApi for RestDeviceApi {
    async fn create(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        debug!(object = object.name(), scope = %scope, "create object");
        let path = format!("objects/{}", object.kind().collection());
        self.send(
            self.request(Method::POST, &path)
                .query(&Self::scope_params(scope))
                .json(&Self::entry_payload(object)),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        debug!(object = object.name(), scope = %scope, "update object");
        let path = format!("objects/{}/{}", object.kind().collection(), object.name());
        self.send(
            self.request(Method::PUT, &path)
                .query(&Self::scope_params(scope))
                .json(&Self::entry_payload(object)),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        debug!(object = object.name(), scope = %scope, "delete object");
        let path = format!("objects/{}/{}", object.kind().collection(), object.name());
        self.send(
            self.request(Method::DELETE, &path)
                .query(&Self::scope_params(scope)),
        )
        .await?;
        Ok(())
    }

    async fn fetch_all(
        &self,
        kind: ObjectKind,
        scope: &Scope,
    ) -> Result<Vec<ConfigObject>, DeviceError> {
        debug!(kind = %kind, scope = %scope, "fetch all objects");
        let path = format!("objects/{}", kind.collection());
        let response = self
            .send(
                self.request(Method::GET, &path)
                    .query(&Self::scope_params(scope)),
            )
            .await?;

        let list: EntryList = response
            .json()
            .await
            .map_err(|e| DeviceError::InvalidResponse(e.to_string()))?;

        list.entries
            .into_iter()
            .map(|entry| Self::decode_entry(kind, entry))
            .collect()
    }

    async fn commit(&self) -> Result<String, DeviceError> {
        debug!("commit pending changes");
        let response = self.send(self.request(Method::POST, "commit")).await?;
        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| DeviceError::InvalidResponse(e.to_string()))?;
        Ok(commit.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, DeviceError> {
        debug!(job_id, "query job status");
        let path = format!("jobs/{}", job_id);
        let response = self.send(self.request(Method::GET, &path)).await?;
        response
            .json()
            .await
            .map_err(|e| DeviceError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DeviceConfig {
        DeviceConfig {
            hostname: "fw.example.com".to_string(),
            ..DeviceConfig::default()
        }
    }

    // Test 1: bare hostnames get the https scheme, URLs pass through
    #[test]
    fn test_base_url() {
        let api = RestDeviceApi::new(&test_config()).unwrap();
        assert_eq!(api.base_url, "https://fw.example.com/api/v1");

        let mut config = test_config();
        config.hostname = "http://127.0.0.1:8443/".to_string();
        let api = RestDeviceApi::new(&config).unwrap();
        assert_eq!(api.base_url, "http://127.0.0.1:8443/api/v1");
    }

    // Test 2: scope query parameters
    #[test]
    fn test_scope_params() {
        let params = RestDeviceApi::scope_params(&Scope::Shared);
        assert_eq!(params, vec![("location", "shared".to_string())]);

        let resolver = crate::scope::ScopeResolver::new();
        let scope = resolver.resolve("Branch-Offices");
        let params = RestDeviceApi::scope_params(&scope);
        assert_eq!(
            params,
            vec![
                ("location", "device-group".to_string()),
                ("device-group", "Branch-Offices".to_string()),
            ]
        );
    }

    // Test 3: address entry payload carries only the set fields
    #[test]
    fn test_address_entry_payload() {
        let addr = Address::new("web-srv1")
            .with_ip_netmask("192.0.2.1/32");
        let entry = RestDeviceApi::entry_payload(&addr.into());

        assert_eq!(
            entry,
            json!({ "name": "web-srv1", "ip-netmask": "192.0.2.1/32" })
        );
    }

    // Test 4: group entry payload for static and dynamic groups
    #[test]
    fn test_group_entry_payload() {
        let group = AddressGroup::new("web-servers")
            .with_static_members(vec!["web-srv1".to_string(), "web-srv2".to_string()]);
        let entry = RestDeviceApi::entry_payload(&group.into());
        assert_eq!(
            entry,
            json!({ "name": "web-servers", "static": ["web-srv1", "web-srv2"] })
        );

        let group = AddressGroup::new("dynamic-web").with_dynamic_filter("'web' in tags");
        let entry = RestDeviceApi::entry_payload(&group.into());
        assert_eq!(
            entry,
            json!({ "name": "dynamic-web", "dynamic": { "filter": "'web' in tags" } })
        );
    }

    // Test 5: wire entries decode back into models per collection
    #[test]
    fn test_decode_entry() {
        let decoded = RestDeviceApi::decode_entry(
            ObjectKind::Address,
            json!({ "name": "db-srv1", "ip-netmask": "192.0.2.7/32" }),
        )
        .unwrap();
        match decoded {
            ConfigObject::Address(addr) => {
                assert_eq!(addr.name, "db-srv1");
                assert_eq!(addr.ip_netmask.as_deref(), Some("192.0.2.7/32"));
            }
            _ => panic!("Expected an address"),
        }

        let err = RestDeviceApi::decode_entry(ObjectKind::Address, json!("not an entry"));
        assert!(matches!(err, Err(DeviceError::InvalidResponse(_))));
    }
}
