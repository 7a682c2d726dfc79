use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::LinkRow;
use exn::ResultExt;
use picsync_link::{Link, unquote};
use std::collections::HashSet;
use tracing::instrument;

/// Turns the activity log into [`Link`]s for one region.
#[derive(Debug, Clone)]
pub struct Resolver {
    region: String,
}

impl Resolver {
    pub fn new(region: impl Into<String>) -> Self {
        Self { region: region.into() }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Query every log entry with an attachment in this region and resolve
    /// them into links, newest first.
    ///
    /// Query failures are returned as-is; nothing is retried.
    #[instrument(skip(self, db), fields(region = %self.region))]
    pub async fn resolve(&self, db: &Database) -> Result<Vec<Link>> {
        let rows: Vec<LinkRow> = sqlx::query_as(include_str!("../queries/select_links.sql"))
            .bind(&self.region)
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::Query)?;
        let row_count = rows.len();
        let links = links_from_rows(rows);
        tracing::info!(rows = row_count, links = links.len(), "Resolved attachment links");
        Ok(links)
    }
}

/// Normalize query rows into links.
///
/// - Rows without an attachment (SQL `NULL`, JSON `null`, or nothing left
///   once quotes are stripped) are dropped.
/// - Rows that can't form a valid [`Link`] are dropped with a warning.
/// - Identical links are kept once, at their first position.
/// - The result is ordered by date, newest first. Links sharing a date keep
///   their query order.
pub fn links_from_rows(rows: impl IntoIterator<Item = LinkRow>) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for row in rows {
        let Some(raw) = row.attachment else {
            continue;
        };
        let url = unquote(&raw);
        if url.is_empty() || url == "null" {
            continue;
        }
        let Some(group) = row.group_name else {
            tracing::warn!(date = %row.date, url = %url, "Skipping attachment with no owning group");
            continue;
        };
        match Link::new(group, row.date, url) {
            Ok(link) => {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            },
            Err(err) => {
                let reason = (*err).to_string();
                tracing::warn!(date = %row.date, reason = %reason, "Skipping unusable attachment reference");
            },
        }
    }
    // Stable: equal dates keep query order.
    links.sort_by(|a, b| b.date().cmp(&a.date()));
    links
}
