//! HTTP client for the Grafana dashboard API.

use crate::error::{ClientError, ClientResult};
use crate::types::{
    CreateFolderRequest, DashboardRef, Folder, HealthStatus, UpsertDashboardRequest,
};
use dashforge_core::Dashboard;
use dashforge_telemetry::Metrics;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Commit message attached to every dashboard version.
const UPSERT_MESSAGE: &str = "Updated by dashforge";

/// Client for publishing dashboards.
pub struct GrafanaClient {
    client: Client,
    /// Server root without trailing slash.
    base_url: String,
    api_key: Option<String>,
}

impl GrafanaClient {
    /// Create a client for `base_url`.
    ///
    /// Requests carry `Authorization: Bearer <key>` when `api_key` is set,
    /// and go out anonymously otherwise.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute link to a dashboard returned by [`GrafanaClient::upsert_dashboard`].
    pub fn dashboard_link(&self, dashboard: &DashboardRef) -> String {
        format!("{}{}", self.base_url, dashboard.url)
    }

    /// `GET /api/health`.
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let request = self.client.get(self.url("/api/health"));
        let response = self.execute("health", request).await?;
        decode(response).await
    }

    /// Look up a folder by exact title, creating it when missing.
    ///
    /// An empty title selects the General folder, which has no uid.
    pub async fn find_or_create_folder(&self, title: &str) -> ClientResult<Option<Folder>> {
        if title.is_empty() {
            debug!("Using General folder");
            return Ok(None);
        }

        let request = self
            .client
            .get(self.url("/api/folders"))
            .query(&[("limit", "1000")]);
        let folders: Vec<Folder> = decode(self.execute("folders", request).await?).await?;

        if let Some(folder) = folders.into_iter().find(|f| f.title == title) {
            debug!(uid = %folder.uid, title = %title, "Reusing existing folder");
            return Ok(Some(folder));
        }

        info!(title = %title, "Creating folder");
        let request = self
            .client
            .post(self.url("/api/folders"))
            .json(&CreateFolderRequest { title });
        let folder: Folder = decode(self.execute("folders", request).await?).await?;
        Ok(Some(folder))
    }

    /// Create or overwrite `dashboard` inside `folder` (General when `None`).
    pub async fn upsert_dashboard(
        &self,
        folder: Option<&Folder>,
        dashboard: &Dashboard,
    ) -> ClientResult<DashboardRef> {
        info!(
            uid = %dashboard.uid_str(),
            folder = folder.map(|f| f.title.as_str()).unwrap_or("General"),
            "Uploading dashboard"
        );

        let body = UpsertDashboardRequest {
            dashboard,
            folder_uid: folder.map(|f| f.uid.as_str()),
            overwrite: true,
            message: UPSERT_MESSAGE,
        };
        let request = self.client.post(self.url("/api/dashboards/db")).json(&body);
        let result: DashboardRef = decode(self.execute("dashboards", request).await?).await?;

        debug!(uid = %result.uid, version = result.version, "Dashboard stored");
        Ok(result)
    }

    /// `DELETE /api/dashboards/uid/<uid>`. A missing dashboard is
    /// [`ClientError::NotFound`].
    pub async fn delete_dashboard(&self, uid: &str) -> ClientResult<()> {
        info!(uid = %uid, "Deleting dashboard");
        let request = self
            .client
            .delete(self.url(&format!("/api/dashboards/uid/{uid}")));
        self.execute("dashboards", request).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request`, record it, and turn non-2xx responses into errors.
    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> ClientResult<Response> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let started = Instant::now();
        let sent = request.send().await;
        let elapsed = started.elapsed().as_secs_f64();

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                Metrics::api_request(endpoint, "error", elapsed);
                return Err(ClientError::HttpClient(format!("HTTP request failed: {e}")));
            }
        };

        let status = response.status();
        Metrics::api_request(endpoint, status.as_str(), elapsed);

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, status = status.as_u16(), "Request rejected");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GrafanaClient::new("http://localhost:3000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/api/health"), "http://localhost:3000/api/health");
    }

    #[test]
    fn test_dashboard_link() {
        let client = GrafanaClient::new("http://grafana", Some(String::new())).unwrap();
        assert!(client.api_key.is_none());
        let link = client.dashboard_link(&DashboardRef {
            uid: "abc".to_string(),
            url: "/d/abc/ops".to_string(),
            version: 3,
            status: "success".to_string(),
        });
        assert_eq!(link, "http://grafana/d/abc/ops");
    }
}
