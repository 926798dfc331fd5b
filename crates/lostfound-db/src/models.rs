/// Database row types, mapped straight from SQLite rows.
/// Timestamps stay as the `YYYY-MM-DD HH:MM:SS` text SQLite stores; the API
/// layer converts them.

pub struct UserRow {
    pub id: i64,
    pub roll_number: String,
    pub password: String,
    pub name: String,
    pub phone_number: String,
    pub created_at: String,
}

pub struct ItemRow {
    pub id: i64,
    pub item_type: String,
    pub description: String,
    pub reporter_name: String,
    pub phone_number: String,
    pub is_found: bool,
    pub report_id: String,
    pub status: String,
    pub user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Values supplied by a reporter. Status always starts as `pending`.
pub struct NewItem<'a> {
    pub item_type: &'a str,
    pub description: &'a str,
    pub reporter_name: &'a str,
    pub phone_number: &'a str,
    pub is_found: bool,
    pub report_id: &'a str,
    pub user_id: i64,
}
