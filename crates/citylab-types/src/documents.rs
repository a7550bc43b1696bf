//! Policy documents supplied to agents as reasoning context.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A document returned by a retriever, ranked by relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RetrievedDocument {
    /// Document id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Category, e.g. `policy`, `regulation`, `report`.
    pub document_type: String,
    /// Text snippet.
    pub content: String,
    /// Relevance in `[0, 1]`, higher is better.
    pub relevance_score: f64,
}

/// A document in a retrievable corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PolicyDocument {
    /// Document id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Category.
    #[serde(default)]
    pub document_type: String,
    /// Full text.
    pub content: String,
}
