//! Loads the music fixtures into the store. Every record becomes one upsert
//! keyed by its natural key, so re-running over unchanged fixtures is a no-op.

use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{EntityCounts, MusicCrownItem};
use crate::ssot::fixtures::{decode, CrownItemFixture, EventFixture, PendingFixture};
use crate::ssot::rules::{self, DatasetRules};
use crate::ssot::{locate_file, read_records, SsotRoot};
use serde_json::Value;

fn load(rules: &DatasetRules, root: &SsotRoot, label: &str) -> AppResult<Vec<Value>> {
    let rule = rules
        .file(label)
        .ok_or_else(|| AppError::Internal(format!("no '{label}' file in {} rules", rules.name)))?;
    let dir = root.dataset_dir(&rules.subdir);
    let path = locate_file(&dir, &rule.candidates, &rule.description)?;
    Ok(read_records(&path)?)
}

pub fn seed_music(db: &Database, root: &SsotRoot) -> AppResult<EntityCounts> {
    let rules = rules::music();
    let events = load(rules, root, "events")?;
    let items = load(rules, root, "items")?;
    let pending = load(rules, root, "pending")?;

    for (index, raw) in events.iter().enumerate() {
        let row = decode::<EventFixture>(raw, "events", index)?.into_row(raw)?;
        tracing::debug!(event_id = %row.id, "upserting music event");
        db.upsert_event(&row)?;
    }

    for (index, raw) in items.iter().enumerate() {
        let row = MusicCrownItem::from(decode::<CrownItemFixture>(raw, "items", index)?);
        tracing::debug!(timeline_index = row.timeline_index, "upserting crown item");
        db.upsert_crown_item(&row)?;
    }

    for (index, raw) in pending.iter().enumerate() {
        let row = decode::<PendingFixture>(raw, "pending", index)?.into_row(raw)?;
        tracing::debug!(pending_id = %row.pending_id, "upserting pending item");
        db.upsert_pending(&row)?;
    }

    let counts = db.entity_counts()?;
    tracing::info!(
        events = counts.events,
        items = counts.items,
        pending = counts.pending,
        "music seed complete"
    );
    Ok(counts)
}

pub fn summary_line(counts: &EntityCounts) -> String {
    format!(
        "[seed] done. events={}, items={}, pending={}",
        counts.events, counts.items, counts.pending
    )
}
