use serde::{Deserialize, Serialize};
use serde_json::Value;

// Raw access rows as read from the database, untyped on purpose
#[derive(Deserialize, Debug, Default)]
pub struct ResolvePortalsRequest {
    #[serde(default)]
    pub rows: Option<Vec<Value>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub timestamp: String,
}
