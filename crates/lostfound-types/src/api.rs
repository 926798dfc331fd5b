use serde::{Deserialize, Serialize};

use crate::models::{Item, Stats, UserProfile};

// Request bodies keep every field optional so that a missing field is
// reported through the regular error envelope instead of a decode failure.

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub roll_number: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub roll_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

// -- Items --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItemRequest {
    pub item_type: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItemResponse {
    pub success: bool,
    pub report_id: String,
    pub item_id: i64,
    pub message: String,
    /// Pending reports of the opposite class with the same item type.
    /// Recomputed on every report, never stored.
    pub matches: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub success: bool,
    pub items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub user_id: Option<i64>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: Stats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
