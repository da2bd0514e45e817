use serde_json::Value;

use super::enums::AuditAction;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub table_name: String,
    /// Text so that placeholder report ids can be recorded too.
    pub record_id: String,
    pub changes: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: String,
    pub changes: serde_json::Map<String, Value>,
    pub created_at: chrono::NaiveDateTime,
}
