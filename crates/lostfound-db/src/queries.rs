use crate::Database;
use crate::models::{ItemRow, NewItem, UserRow};
use anyhow::Result;
use lostfound_types::models::{ItemKind, Stats};
use rusqlite::{Connection, Row, params};

const ITEM_COLUMNS: &str = "id, item_type, description, reporter_name, phone_number, is_found, \
                            report_id, status, user_id, created_at, updated_at";

/// Result of the owner-only pending -> resolved transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved,
    /// A pending report exists but belongs to someone else.
    NotOwner,
    /// No pending report carries that id (unknown or already resolved).
    NotFound,
}

impl Database {
    // -- Users --

    /// Insert a user and return its id, or `None` if the roll number is taken.
    pub fn create_user(
        &self,
        roll_number: &str,
        password_hash: &str,
        name: &str,
        phone_number: &str,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (roll_number, password, name, phone_number) VALUES (?1, ?2, ?3, ?4)",
                params![roll_number, password_hash, name, phone_number],
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_roll_number(&self, roll_number: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_roll_number(conn, roll_number))
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Items --

    pub fn insert_item(&self, item: &NewItem<'_>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO items (item_type, description, reporter_name, phone_number, is_found, report_id, status, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
                params![
                    item.item_type,
                    item.description,
                    item.reporter_name,
                    item.phone_number,
                    item.is_found,
                    item.report_id,
                    item.user_id,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Pending reports of class `kind` sharing `item_type`, newest first.
    pub fn find_candidates(&self, item_type: &str, kind: ItemKind, limit: u32) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            query_items(
                conn,
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE item_type = ?1 AND is_found = ?2 AND status = 'pending'
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?3"
                ),
                params![item_type, kind.is_found(), limit],
            )
        })
    }

    pub fn search_by_type(&self, item_type: &str) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            query_items(
                conn,
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE item_type = ?1 AND status = 'pending'
                     ORDER BY created_at DESC, id DESC"
                ),
                params![item_type],
            )
        })
    }

    /// Case-insensitive substring match on the description. Both sides are
    /// lowercased with Unicode rules and compared with `instr`, so the
    /// keyword is matched literally.
    pub fn search_by_description(&self, keyword: &str) -> Result<Vec<ItemRow>> {
        let needle = keyword.to_lowercase();
        self.with_conn(|conn| {
            query_items(
                conn,
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE instr(lower_unicode(description), ?1) > 0 AND status = 'pending'
                     ORDER BY created_at DESC, id DESC"
                ),
                params![needle],
            )
        })
    }

    /// All pending reports, optionally restricted to one class.
    pub fn list_pending(&self, kind: Option<ItemKind>) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| match kind {
            Some(kind) => query_items(
                conn,
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE is_found = ?1 AND status = 'pending'
                     ORDER BY created_at DESC, id DESC"
                ),
                params![kind.is_found()],
            ),
            None => query_items(
                conn,
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE status = 'pending'
                     ORDER BY created_at DESC, id DESC"
                ),
                params![],
            ),
        })
    }

    /// Mark a report resolved if, and only if, it is pending and owned by
    /// `user_id`. The ownership check and the transition are one UPDATE.
    pub fn resolve_item(&self, report_id: &str, user_id: i64) -> Result<ResolveOutcome> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE items SET status = 'resolved', updated_at = datetime('now')
                 WHERE report_id = ?1 AND user_id = ?2 AND status = 'pending'",
                params![report_id, user_id],
            )?;
            if changed > 0 {
                return Ok(ResolveOutcome::Resolved);
            }

            // Still under the writer lock, so nothing can change in between
            let pending_owner: Option<i64> = conn
                .query_row(
                    "SELECT user_id FROM items WHERE report_id = ?1 AND status = 'pending'",
                    [report_id],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(match pending_owner {
                Some(_) => ResolveOutcome::NotOwner,
                None => ResolveOutcome::NotFound,
            })
        })
    }

    // -- Stats --

    pub fn stats(&self) -> Result<Stats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(status = 'pending'), 0),
                    -- timestamps are stored in UTC; \"today\" is the server's local date
                    COALESCE(SUM(status = 'resolved'
                                 AND date(updated_at, 'localtime') = date('now', 'localtime')), 0),
                    COALESCE(SUM(status = 'pending' AND is_found = 0), 0),
                    COALESCE(SUM(status = 'pending' AND is_found = 1), 0)
                 FROM items",
                [],
                |row| {
                    Ok(Stats {
                        total: row.get(0)?,
                        pending: row.get(1)?,
                        resolved_today: row.get(2)?,
                        lost: row.get(3)?,
                        found: row.get(4)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}

fn query_user_by_roll_number(conn: &Connection, roll_number: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, roll_number, password, name, phone_number, created_at FROM users WHERE roll_number = ?1",
    )?;

    let row = stmt
        .query_row([roll_number], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                roll_number: row.get(1)?,
                password: row.get(2)?,
                name: row.get(3)?,
                phone_number: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_items<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ItemRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, item_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        item_type: row.get(1)?,
        description: row.get(2)?,
        reporter_name: row.get(3)?,
        phone_number: row.get(4)?,
        is_found: row.get(5)?,
        report_id: row.get(6)?,
        status: row.get(7)?,
        user_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db"), 2).unwrap();
        (dir, db)
    }

    fn add_user(db: &Database, roll: &str) -> i64 {
        db.create_user(roll, "hash", "Student", "1234567890").unwrap().unwrap()
    }

    fn get_item(db: &Database, report_id: &str) -> ItemRow {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE report_id = ?1"),
                [report_id],
                item_from_row,
            )?)
        })
        .unwrap()
    }

    fn add_item(db: &Database, user_id: i64, item_type: &str, description: &str, kind: ItemKind) -> String {
        let report_id = uuid::Uuid::new_v4().to_string();
        db.insert_item(&NewItem {
            item_type,
            description,
            reporter_name: "Student",
            phone_number: "1234567890",
            is_found: kind.is_found(),
            report_id: &report_id,
            user_id,
        })
        .unwrap();
        report_id
    }

    #[test]
    fn duplicate_roll_number_is_rejected() {
        let (_dir, db) = open_db();
        assert!(db.create_user("21CS001", "h", "A", "1").unwrap().is_some());
        assert!(db.create_user("21CS001", "h", "B", "2").unwrap().is_none());
    }

    #[test]
    fn user_lookup() {
        let (_dir, db) = open_db();
        let id = add_user(&db, "21CS002");
        let user = db.get_user_by_roll_number("21CS002").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(db.user_exists(id).unwrap());
        assert!(!db.user_exists(id + 100).unwrap());
        assert!(db.get_user_by_roll_number("nobody").unwrap().is_none());
    }

    #[test]
    fn candidates_are_opposite_class_and_pending() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        let found = add_item(&db, owner, "phone", "black phone", ItemKind::Found);
        let resolved = add_item(&db, owner, "phone", "white phone", ItemKind::Found);
        add_item(&db, owner, "phone", "my phone", ItemKind::Lost);
        add_item(&db, owner, "wallet", "brown wallet", ItemKind::Found);
        assert_eq!(db.resolve_item(&resolved, owner).unwrap(), ResolveOutcome::Resolved);

        let matches = db.find_candidates("phone", ItemKind::Found, 5).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].report_id, found);
    }

    #[test]
    fn candidates_are_capped() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        for i in 0..7 {
            add_item(&db, owner, "keys", &format!("keys #{i}"), ItemKind::Lost);
        }
        let matches = db.find_candidates("keys", ItemKind::Lost, 5).unwrap();
        assert_eq!(matches.len(), 5);
        // Newest first
        assert_eq!(matches[0].description, "keys #6");
    }

    #[test]
    fn description_search_is_case_insensitive_and_literal() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        add_item(&db, owner, "bag", "Blue Backpack with stickers", ItemKind::Lost);
        add_item(&db, owner, "bottle", "100% steel bottle", ItemKind::Found);

        assert_eq!(db.search_by_description("backpack").unwrap().len(), 1);
        assert_eq!(db.search_by_description("BLUE").unwrap().len(), 1);
        assert_eq!(db.search_by_description("%").unwrap().len(), 1);
        assert!(db.search_by_description("_lue").unwrap().is_empty());
    }

    #[test]
    fn listings_hide_resolved_reports() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        let lost = add_item(&db, owner, "watch", "gold watch", ItemKind::Lost);
        add_item(&db, owner, "watch", "silver watch", ItemKind::Found);
        db.resolve_item(&lost, owner).unwrap();

        assert_eq!(db.list_pending(None).unwrap().len(), 1);
        assert!(db.list_pending(Some(ItemKind::Lost)).unwrap().is_empty());
        assert_eq!(db.list_pending(Some(ItemKind::Found)).unwrap().len(), 1);
        assert!(db.search_by_type("watch").unwrap().iter().all(|r| r.is_found));
    }

    #[test]
    fn resolve_is_owner_only_and_one_way() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "owner");
        let other = add_user(&db, "other");
        let report = add_item(&db, owner, "laptop", "grey laptop", ItemKind::Lost);

        assert_eq!(db.resolve_item(&report, other).unwrap(), ResolveOutcome::NotOwner);
        assert_eq!(db.resolve_item("missing", owner).unwrap(), ResolveOutcome::NotFound);
        assert_eq!(db.resolve_item(&report, owner).unwrap(), ResolveOutcome::Resolved);
        assert_eq!(db.resolve_item(&report, owner).unwrap(), ResolveOutcome::NotFound);
        assert_eq!(db.resolve_item(&report, other).unwrap(), ResolveOutcome::NotFound);

        let row = get_item(&db, &report);
        assert_eq!(row.status, "resolved");
        assert_eq!(row.user_id, owner);
        assert!(!row.is_found);
    }

    #[test]
    fn stats_counts() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        let a = add_item(&db, owner, "phone", "a", ItemKind::Lost);
        add_item(&db, owner, "phone", "b", ItemKind::Lost);
        add_item(&db, owner, "phone", "c", ItemKind::Found);
        db.resolve_item(&a, owner).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(
            stats,
            Stats { total: 3, pending: 2, resolved_today: 1, lost: 1, found: 1 }
        );
    }

    #[test]
    fn description_search_folds_non_ascii_case() {
        let (_dir, db) = open_db();
        let owner = add_user(&db, "u1");
        add_item(&db, owner, "bag", "Sac À DOS vert", ItemKind::Lost);
        add_item(&db, owner, "other", "ÉCHARPE rouge", ItemKind::Found);

        assert_eq!(db.search_by_description("à dos").unwrap().len(), 1);
        assert_eq!(db.search_by_description("SAC À DOS").unwrap().len(), 1);
        assert_eq!(db.search_by_description("écharpe").unwrap().len(), 1);
        assert!(db.search_by_description("à dosv").unwrap().is_empty());
    }
}
