//! Request and response bodies of the Grafana HTTP API.

use serde::{Deserialize, Serialize};

/// Dashboard folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Result of a dashboard upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRef {
    pub uid: String,
    /// Path relative to the server root, e.g. `/d/<uid>/<slug>`.
    pub url: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub status: String,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateFolderRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertDashboardRequest<'a, D: Serialize> {
    pub dashboard: &'a D,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<&'a str>,
    pub overwrite: bool,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_request_omits_general_folder() {
        let dashboard = serde_json::json!({"title": "x"});
        let body = UpsertDashboardRequest {
            dashboard: &dashboard,
            folder_uid: None,
            overwrite: true,
            message: "m",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("folderUid").is_none());
        assert_eq!(value["overwrite"], true);
        assert_eq!(value["dashboard"]["title"], "x");
    }

    #[test]
    fn test_dashboard_ref_tolerates_missing_fields() {
        let parsed: DashboardRef =
            serde_json::from_str(r#"{"uid":"abc","url":"/d/abc/x"}"#).unwrap();
        assert_eq!(parsed.version, 0);
        assert_eq!(parsed.url, "/d/abc/x");
    }
}
