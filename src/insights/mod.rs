use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::session::Session;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub name: String,
    pub embed_url: String,
    pub drive_url: String,
    pub modified_time: DateTime<Utc>,
}

/// One entry as returned by the external document index.
#[derive(Debug, Deserialize)]
struct IndexFile {
    id: String,
    name: String,
    #[serde(rename = "modifiedTime")]
    modified_time: DateTime<Utc>,
    #[serde(rename = "webViewLink")]
    web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    files: Vec<IndexFile>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    pub limit: Option<usize>,
}

/// The index hands out view links; the dashboard embeds the preview variant.
pub fn embed_url_for(drive_url: &str) -> String {
    match drive_url.strip_suffix("/view") {
        Some(base) => format!("{base}/preview"),
        None => drive_url.to_string(),
    }
}

pub fn sort_by_recency(items: &mut [Insight]) {
    items.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
}

pub async fn list_insights(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<Vec<Insight>>, ApiError> {
    let cfg = &state.config.insights;
    let url = format!(
        "{}/files?folder={}&orderBy=modifiedTime",
        cfg.index_url, cfg.folder_id
    );

    let mut request = state.http.get(&url);
    if !cfg.api_key.is_empty() {
        request = request.bearer_auth(&cfg.api_key);
    }

    let response = request.send().await.map_err(|e| {
        error!("document index request failed: {}", e);
        ApiError::Upstream("document index unavailable".to_string())
    })?;

    if !response.status().is_success() {
        error!("document index returned {}", response.status());
        return Err(ApiError::Upstream("document index unavailable".to_string()));
    }

    let payload: IndexResponse = response.json().await.map_err(|e| {
        error!("document index payload malformed: {}", e);
        ApiError::Upstream("document index returned malformed data".to_string())
    })?;

    let mut insights: Vec<Insight> = payload
        .files
        .into_iter()
        .map(|f| Insight {
            embed_url: embed_url_for(&f.web_view_link),
            drive_url: f.web_view_link,
            id: f.id,
            name: f.name,
            modified_time: f.modified_time,
        })
        .collect();

    sort_by_recency(&mut insights);
    insights.truncate(query.limit.unwrap_or(10));

    Ok(Json(insights))
}

pub fn configure_insight_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/insights", get(list_insights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn insight(name: &str, ts: DateTime<Utc>) -> Insight {
        Insight {
            id: name.to_string(),
            name: name.to_string(),
            embed_url: String::new(),
            drive_url: String::new(),
            modified_time: ts,
        }
    }

    #[test]
    fn most_recent_first() {
        let t = |h| Utc.with_ymd_and_hms(2025, 3, 1, h, 0, 0).unwrap();
        let mut items = vec![
            insight("old", t(1)),
            insight("newest", t(9)),
            insight("middle", t(5)),
        ];
        sort_by_recency(&mut items);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["newest", "middle", "old"]);
    }

    #[test]
    fn view_links_become_previews() {
        assert_eq!(
            embed_url_for("https://drive.test/file/d/abc/view"),
            "https://drive.test/file/d/abc/preview"
        );
        assert_eq!(embed_url_for("https://drive.test/other"), "https://drive.test/other");
    }
}
