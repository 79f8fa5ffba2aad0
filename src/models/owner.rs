use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account record the pantry items belong to. Accounts live in an outer
/// system; this is the local mirror plus its custom categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
