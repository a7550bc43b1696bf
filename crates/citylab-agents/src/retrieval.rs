//! The document retrieval contract and its in-process implementations.
//!
//! Retrievers rank policy snippets for an agent's reasoning call. An empty
//! result is a normal answer. Each agent kind gets its query enhanced with
//! topic words for its role before ranking.

use std::path::Path;

use citylab_types::{AgentKind, PolicyDocument, RetrievedDocument};
use futures::future::BoxFuture;

use crate::error::RetrievalError;

/// Supplies ranked documents for a reasoning call.
pub trait DocumentRetriever: Send + Sync {
    /// Return at most `limit` documents, most relevant first.
    fn retrieve<'a>(
        &'a self,
        kind: AgentKind,
        query: &'a str,
        context: &'a serde_json::Value,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RetrievedDocument>, RetrievalError>>;
}

/// Topic words appended to every query issued on behalf of `kind`.
pub const fn query_topics(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Planner => "urban planning policy regulation budget",
        AgentKind::TransitOperator => "transit public transportation route frequency budget",
        AgentKind::Resident => "transportation policy fare pricing accessibility",
        AgentKind::Orchestrator => "",
    }
}

/// Build the query a retriever should rank against.
pub fn enhance_query(kind: AgentKind, query: &str) -> String {
    let topics = query_topics(kind);
    if topics.is_empty() {
        query.to_owned()
    } else {
        format!("{query} {topics}")
    }
}

/// A retriever with no documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetrieval;

impl DocumentRetriever for NoRetrieval {
    fn retrieve<'a>(
        &'a self,
        _kind: AgentKind,
        _query: &'a str,
        _context: &'a serde_json::Value,
        _limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RetrievedDocument>, RetrievalError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Ranks an in-memory corpus by term overlap with the enhanced query.
///
/// Relevance is the share of distinct query terms found in the document's
/// title or content. Documents with no overlap are not returned. Ties are
/// broken by document id, so results are stable.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<IndexedDocument>,
}

#[derive(Debug, Clone)]
struct IndexedDocument {
    document: PolicyDocument,
    terms: std::collections::BTreeSet<String>,
}

fn terms(text: &str) -> std::collections::BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

impl KeywordRetriever {
    /// Index a corpus.
    pub fn new(documents: Vec<PolicyDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|document| IndexedDocument {
                terms: terms(&format!("{} {}", document.title, document.content)),
                document,
            })
            .collect();
        Self { documents }
    }

    /// Load a corpus from a JSON array of documents.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Io`] or [`RetrievalError::Parse`].
    pub fn from_path(path: &Path) -> Result<Self, RetrievalError> {
        let raw = std::fs::read_to_string(path)?;
        let documents: Vec<PolicyDocument> = serde_json::from_str(&raw)?;
        Ok(Self::new(documents))
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank synchronously.
    pub fn rank(&self, kind: AgentKind, query: &str, limit: usize) -> Vec<RetrievedDocument> {
        let wanted = terms(&enhance_query(kind, query));
        let Ok(wanted_count) = u32::try_from(wanted.len()) else {
            return Vec::new();
        };
        if wanted_count == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &PolicyDocument)> = self
            .documents
            .iter()
            .filter_map(|indexed| {
                let hits = wanted.intersection(&indexed.terms).count();
                let hits = u32::try_from(hits).ok()?;
                (hits > 0).then(|| (f64::from(hits) / f64::from(wanted_count), &indexed.document))
            })
            .collect();
        scored.sort_by(|(a_score, a_doc), (b_score, b_doc)| {
            b_score.total_cmp(a_score).then_with(|| a_doc.id.cmp(&b_doc.id))
        });

        scored
            .into_iter()
            .take(limit)
            .map(|(relevance_score, doc)| RetrievedDocument {
                id: doc.id.clone(),
                title: doc.title.clone(),
                document_type: doc.document_type.clone(),
                content: doc.content.clone(),
                relevance_score,
            })
            .collect()
    }
}

impl DocumentRetriever for KeywordRetriever {
    fn retrieve<'a>(
        &'a self,
        kind: AgentKind,
        query: &'a str,
        _context: &'a serde_json::Value,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RetrievedDocument>, RetrievalError>> {
        Box::pin(async move { Ok(self.rank(kind, query, limit)) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, content: &str) -> PolicyDocument {
        PolicyDocument {
            id: id.to_owned(),
            title: title.to_owned(),
            document_type: String::from("policy"),
            content: content.to_owned(),
        }
    }

    fn corpus() -> KeywordRetriever {
        KeywordRetriever::new(vec![
            doc(
                "d1",
                "Bus frequency guidelines",
                "Headways on trunk routes and transit budget rules.",
            ),
            doc("d2", "Zoning code", "Setbacks and lot coverage."),
            doc("d3", "Fare policy", "Transit fare pricing and accessibility discounts."),
        ])
    }

    #[test]
    fn queries_are_enhanced_per_kind() {
        assert_eq!(
            enhance_query(AgentKind::Resident, "commute"),
            "commute transportation policy fare pricing accessibility"
        );
        assert_eq!(enhance_query(AgentKind::Orchestrator, "tick"), "tick");
    }

    #[test]
    fn ranks_by_overlap_and_respects_limit() {
        let retriever = corpus();
        let docs = retriever.rank(AgentKind::Resident, "fare", 2);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "d3");
        assert!(docs[0].relevance_score > 0.0 && docs[0].relevance_score <= 1.0);

        let docs = retriever.rank(AgentKind::TransitOperator, "headways", 1);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "d1");
    }

    #[test]
    fn no_overlap_returns_empty() {
        assert!(corpus().rank(AgentKind::Orchestrator, "weather", 5).is_empty());
        assert!(KeywordRetriever::default().rank(AgentKind::Planner, "zoning", 5).is_empty());
    }

    #[tokio::test]
    async fn no_retrieval_is_empty() {
        let docs = NoRetrieval
            .retrieve(AgentKind::Planner, "zoning", &serde_json::Value::Null, 5)
            .await
            .unwrap();
        assert!(docs.is_empty());
    }
}
