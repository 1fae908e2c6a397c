use chrono::NaiveDateTime;
use serde::Serialize;

/// The fallback bucket every identity implicitly has.
pub const GLOBAL_MODULE: &str = "global";

/// One immutable accounting row. A row is strictly a grant
/// (credits_added > 0, credits_used = 0) or a usage (the inverse),
/// never both. Balance is always derived by summation, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CreditEntry {
    pub id: i64,
    pub identity_id: i64,
    pub module: String,
    pub credits_added: i64,
    pub credits_used: i64,
    /// Free-text provenance, e.g. "order_completed" or "api_use".
    pub source: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Grant,
    Usage,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditKind::Grant => "grant",
            CreditKind::Usage => "usage",
        }
    }
}

/// Secondary audit record cross-referencing a ledger mutation.
/// Write-only, for observability; never authoritative for balance.
#[derive(Debug, Clone, Serialize)]
pub struct UsageLogEntry {
    pub id: i64,
    pub identity_id: i64,
    pub module: String,
    pub credit_type: String,
    pub credits: i64,
    pub reference: Option<String>,
    pub used_at: Option<NaiveDateTime>,
}

/// Normalizes a module name to its storage form: trimmed, lowercased,
/// restricted to `[a-z0-9_-]`. Returns None when nothing survives.
pub fn normalize_module(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}
