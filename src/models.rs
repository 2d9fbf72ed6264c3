use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicEvent {
    pub id: String,
    pub event_date: String,
    pub planned_count: i64,
    pub decided_count: i64,
    pub status: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicCrownItem {
    pub timeline_index: i64,
    pub event_id: String,
    pub crown_date: String,
    pub title: String,
    pub card_received_date: String,
    pub note: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicPending {
    pub pending_id: String,
    pub temp_code: String,
    pub title: String,
    pub reason: String,
}

/// Projection of a crown item returned by the reason endpoint and stored as
/// the audit snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrownItemReason {
    pub timeline_index: i64,
    pub title: String,
    pub reason: String,
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReason {
    pub pending_id: String,
    pub temp_code: String,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditEntityType {
    MusicCrownItem,
    MusicPending,
}

impl AuditEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MusicCrownItem => "musicCrownItem",
            Self::MusicPending => "musicPending",
        }
    }
}

pub const ACTION_UPDATE_REASON: &str = "update_reason";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub events: i64,
    pub items: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicSummary {
    #[serde(flatten)]
    pub counts: EntityCounts,
    pub last_event_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsotStatus {
    pub root: String,
    pub exists: bool,
    pub is_dir: bool,
    pub entries: Vec<String>,
}
