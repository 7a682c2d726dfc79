use time::Date;

/// One row of the link query, as returned by the database.
///
/// Nothing here has been cleaned up yet: the attachment still carries its
/// JSON quoting and may be missing entirely.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LinkRow {
    pub date: Date,
    pub group_name: Option<String>,
    pub region_name: Option<String>,
    pub attachment: Option<String>,
}
