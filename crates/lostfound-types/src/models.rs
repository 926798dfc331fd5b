use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a report. The only transition is `Pending -> Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Resolved,
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "resolved" => Ok(ItemStatus::Resolved),
            other => Err(format!("unknown item status '{other}'")),
        }
    }
}

/// Which side of the registry a report sits on. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Lost,
    Found,
}

impl ItemKind {
    pub fn is_found(self) -> bool {
        matches!(self, ItemKind::Found)
    }

    /// The class a candidate match has to belong to.
    pub fn opposite(self) -> Self {
        match self {
            ItemKind::Lost => ItemKind::Found,
            ItemKind::Found => ItemKind::Lost,
        }
    }
}

/// A lost or found report as exposed over the API.
///
/// Field names mirror the `items` columns so clients can treat a report the
/// same way whether it came from a listing or from a `matches` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub item_type: String,
    pub description: String,
    pub reporter_name: String,
    pub phone_number: String,
    pub is_found: bool,
    pub report_id: String,
    pub status: ItemStatus,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public part of a user account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub roll_number: String,
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: i64,
    pub pending: i64,
    pub resolved_today: i64,
    pub lost: i64,
    pub found: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_only_known_values() {
        assert_eq!("pending".parse::<ItemStatus>(), Ok(ItemStatus::Pending));
        assert_eq!("resolved".parse::<ItemStatus>(), Ok(ItemStatus::Resolved));
        assert!("Pending".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn kinds_are_opposites() {
        assert_eq!(ItemKind::Lost.opposite(), ItemKind::Found);
        assert_eq!(ItemKind::Found.opposite(), ItemKind::Lost);
        assert!(ItemKind::Found.is_found());
        assert!(!ItemKind::Lost.is_found());
    }

    #[test]
    fn stats_use_camel_case_keys() {
        let stats = Stats { resolved_today: 2, ..Default::default() };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["resolvedToday"], 2);
    }
}
