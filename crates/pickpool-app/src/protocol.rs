// Request/response messages exchanged with pool clients, one JSON object per line.

use chrono::{DateTime, Utc};
use pickpool_core::model::{PickFields, ResultUpdate, SpreadUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A client request, tagged by `op`. Write requests carry an optional
/// `timestamp`; when absent the server's clock is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    SubmitPick(SubmitPick),
    SetCleared(SetCleared),
    UpsertSpread(UpsertSpread),
    UpsertResult(UpsertResult),
    GetCurrentPicks { week: String, picker: String },
    GetAllCurrentPicks,
    GetSpreads { week: String },
    GetResults { week: String },
    GetAllResults,
    Standings { week: String },
    RegradeWeek { week: String },
    /// Bulk pick submission from CSV text with a header row.
    ImportPicksCsv { csv: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitPick {
    pub week: String,
    pub picker: String,
    #[serde(default)]
    pub game_key: String,
    #[serde(flatten)]
    pub fields: PickFields,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetCleared {
    pub week: String,
    pub picker: String,
    pub cleared: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpsertSpread {
    #[serde(flatten)]
    pub update: SpreadUpdate,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpsertResult {
    #[serde(flatten)]
    pub update: ResultUpdate,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Request {
    /// Operation name, for logging.
    pub fn op(&self) -> &'static str {
        match self {
            Request::SubmitPick(_) => "submit_pick",
            Request::SetCleared(_) => "set_cleared",
            Request::UpsertSpread(_) => "upsert_spread",
            Request::UpsertResult(_) => "upsert_result",
            Request::GetCurrentPicks { .. } => "get_current_picks",
            Request::GetAllCurrentPicks => "get_all_current_picks",
            Request::GetSpreads { .. } => "get_spreads",
            Request::GetResults { .. } => "get_results",
            Request::GetAllResults => "get_all_results",
            Request::Standings { .. } => "standings",
            Request::RegradeWeek { .. } => "regrade_week",
            Request::ImportPicksCsv { .. } => "import_picks_csv",
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response carrying `data`. A payload that fails to
    /// serialize becomes an error response.
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                ok: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::failure(format!("failed to encode response: {e}")),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Single-line JSON encoding.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"ok":false,"error":"failed to encode response"}"#.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
