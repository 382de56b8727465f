use crate::error::{ControllerError, Result};
use crate::traits::ClusterClient;
use async_trait::async_trait;
use podchaos_core::{GroupVersionKind, Monkey, MonkeyList, ObjectKey, Pod, Resource, Selector};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// HTTP client for the Kubernetes API server
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

impl ApiClient {
    /// Client without authentication, using the system trust roots
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token: None,
        }
    }

    /// Client with an optional bearer token and extra PEM CA bundle
    pub fn with_auth(base_url: &str, token: Option<String>, ca_pem: Option<&[u8]>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(pem) = ca_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(|e| {
                ControllerError::invalid_config(
                    format!("Failed to parse CA bundle: {}", e),
                    "Pass a PEM encoded certificate to --ca-file",
                )
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|e| {
            ControllerError::internal_error(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, resource_key: &str) -> Result<Response> {
        let resp = builder.send().await.map_err(|e| {
            ControllerError::api_error(None, format!("HTTP request failed: {}", e))
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ControllerError::not_found(resource_key),
            StatusCode::CONFLICT => ControllerError::conflict(resource_key, body),
            _ => ControllerError::api_error(
                Some(status.as_u16()),
                format!("Request for {} failed with status {}: {}", resource_key, status, body),
            ),
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        resp.json::<T>().await.map_err(|e| {
            ControllerError::api_error(None, format!("Failed to parse {}: {}", what, e))
        })
    }
}

#[async_trait]
impl ClusterClient for ApiClient {
    async fn get_monkey(&self, key: &ObjectKey) -> Result<Monkey> {
        let path = Monkey::static_gvk().object_path(key);
        let resp = self
            .send(self.request(Method::GET, &path), &format!("monkey {}", key))
            .await?;
        Self::decode(resp, "monkey").await
    }

    async fn list_monkeys(&self, namespace: Option<&str>) -> Result<Vec<Monkey>> {
        let path = Monkey::static_gvk().collection_path(namespace);
        let resp = self
            .send(self.request(Method::GET, &path), "monkeys")
            .await?;
        let list: MonkeyList = Self::decode(resp, "monkey list").await?;
        Ok(list.items)
    }

    async fn update_monkey_status(&self, monkey: &Monkey) -> Result<Monkey> {
        let key = monkey.object_key().map_err(|e| {
            ControllerError::internal_error(format!("Monkey has no identity: {}", e))
        })?;
        let path = format!("{}/status", Monkey::static_gvk().object_path(&key));
        let resp = self
            .send(
                self.request(Method::PUT, &path).json(monkey),
                &format!("monkey {}", key),
            )
            .await?;
        Self::decode(resp, "monkey").await
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>> {
        let path = GroupVersionKind::new("", "v1", "Pod").collection_path(Some(namespace));
        let mut builder = self.request(Method::GET, &path);
        if !selector.is_empty() {
            builder = builder.query(&[("labelSelector", selector.to_string())]);
        }
        let resp = self
            .send(builder, &format!("pods in {}", namespace))
            .await?;
        let list: PodList = Self::decode(resp, "pod list").await?;
        Ok(list.items)
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: i64,
    ) -> Result<()> {
        let key = ObjectKey::new(namespace, name);
        let path = GroupVersionKind::new("", "v1", "Pod").object_path(&key);
        let builder = self
            .request(Method::DELETE, &path)
            .query(&[("gracePeriodSeconds", grace_period_seconds)]);
        self.send(builder, &format!("pod {}", key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = ApiClient::new("https://10.0.0.1:6443/");
        assert_eq!(client.base_url(), "https://10.0.0.1:6443");
        assert_eq!(
            client.url("/api/v1/pods"),
            "https://10.0.0.1:6443/api/v1/pods"
        );
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let client =
            ApiClient::with_auth("https://10.0.0.1:6443", Some(" \n".to_string()), None).unwrap();
        assert!(client.token.is_none());

        let client =
            ApiClient::with_auth("https://10.0.0.1:6443", Some("abc\n".to_string()), None).unwrap();
        assert_eq!(client.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_ca_bundle_is_a_config_error() {
        let result = ApiClient::with_auth("https://10.0.0.1:6443", None, Some(b"not a pem"));
        assert!(matches!(
            result,
            Err(ControllerError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_api_error() {
        // Port 1 is reserved (tcpmux) and not listening in test environments
        let client = ApiClient::new("http://127.0.0.1:1");
        let result = client
            .get_monkey(&ObjectKey::new("workloads", "test"))
            .await;
        assert!(matches!(
            result,
            Err(ControllerError::ApiError { status: None, .. })
        ));
    }
}
