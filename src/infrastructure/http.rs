//! HTTP gateway for the chain backend REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::domain::{ChainDetail, ChainId, ElementType, ElementTypeId, NewNode, Node, NodeId};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{GatewayError, GatewayResult, RemoteGateway};

#[derive(Debug, Serialize)]
struct CreateNodeBody<'a> {
    element_type: &'a ElementTypeId,
    parent: Option<&'a NodeId>,
    chain_type: &'a ChainId,
}

#[derive(Debug, Serialize)]
struct MoveNodeBody<'a> {
    new_parent_id: Option<&'a NodeId>,
}

/// Gateway talking JSON to `{base}/chaintypes/...` and `{base}/elementtypes/`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> InfraResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InfraError::http("build HTTP client", e))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_settings(settings: &Settings) -> InfraResult<Self> {
        Self::new(
            settings.api_base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chain_detail_url(&self, chain_id: &ChainId) -> String {
        format!("{}/chaintypes/types/{}/", self.base_url, chain_id)
    }

    fn element_types_url(&self) -> String {
        format!("{}/elementtypes/", self.base_url)
    }

    fn nodes_url(&self) -> String {
        format!("{}/chaintypes/nodes/", self.base_url)
    }

    fn node_url(&self, node_id: &NodeId) -> String {
        format!("{}/chaintypes/nodes/{}/", self.base_url, node_id)
    }

    fn move_url(&self, node_id: &NodeId) -> String {
        format!("{}/chaintypes/nodes/{}/move/", self.base_url, node_id)
    }

    /// Send a request and map transport failures and non-2xx answers.
    async fn send(&self, request: RequestBuilder, url: &str) -> GatewayResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("{url}: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "response from {}", url);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body
                },
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> GatewayResult<T> {
        let body = self.send(request, url).await?;
        decode(&body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> GatewayResult<T> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_chain_detail(&self, chain_id: &ChainId) -> GatewayResult<ChainDetail> {
        let url = self.chain_detail_url(chain_id);
        self.send_json(self.client.get(&url), &url).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_element_types(&self) -> GatewayResult<Vec<ElementType>> {
        let url = self.element_types_url();
        self.send_json(self.client.get(&url), &url).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_node(&self, new_node: &NewNode) -> GatewayResult<Node> {
        let url = self.nodes_url();
        let body = CreateNodeBody {
            element_type: &new_node.element_type_id,
            parent: new_node.parent_id.as_ref(),
            chain_type: &new_node.chain_id,
        };
        self.send_json(self.client.post(&url).json(&body), &url).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_node(&self, node_id: &NodeId) -> GatewayResult<()> {
        let url = self.node_url(node_id);
        self.send(self.client.delete(&url), &url).await.map(|_| ())
    }

    #[instrument(level = "debug", skip(self))]
    async fn move_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> GatewayResult<()> {
        let url = self.move_url(node_id);
        let body = MoveNodeBody { new_parent_id };
        self.send(self.client.post(&url).json(&body), &url)
            .await
            .map(|_| ())
    }
}
