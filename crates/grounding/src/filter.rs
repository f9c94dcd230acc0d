//! Source filter builder.
//!
//! Turns resolved document identifiers into the retrieval-time predicate
//! "source is one of {locators}" and renders it for each index backend.

use codelogic_core::EmptySelectionPolicy;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Retrieval-time predicate over passage `source` metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    /// Source must equal one of these locators. An empty set matches nothing.
    SourceIn(BTreeSet<String>),

    /// No restriction on source.
    Unrestricted,
}

impl SourceFilter {
    /// True when no passage can satisfy this filter.
    pub fn matches_nothing(&self) -> bool {
        matches!(self, SourceFilter::SourceIn(locators) if locators.is_empty())
    }

    /// Evaluate the filter against a source locator.
    pub fn matches(&self, source: Option<&str>) -> bool {
        match self {
            SourceFilter::SourceIn(locators) => source.is_some_and(|s| locators.contains(s)),
            SourceFilter::Unrestricted => true,
        }
    }

    /// Locators allowed by this filter, `None` when unrestricted.
    pub fn locators(&self) -> Option<&BTreeSet<String>> {
        match self {
            SourceFilter::SourceIn(locators) => Some(locators),
            SourceFilter::Unrestricted => None,
        }
    }

    /// Pinecone metadata filter, e.g. `{"source": {"$in": [...]}}`.
    pub fn to_pinecone(&self) -> Option<Value> {
        self.locators()
            .map(|locators| json!({ "source": { "$in": locators } }))
    }

    /// SQL predicate for LanceDB `only_if`.
    pub fn to_sql(&self) -> Option<String> {
        let locators = self.locators()?;

        if locators.is_empty() {
            return Some("false".to_string());
        }

        let quoted: Vec<String> = locators
            .iter()
            .map(|l| format!("'{}'", l.replace('\'', "''")))
            .collect();

        Some(format!("source IN ({})", quoted.join(", ")))
    }
}

/// Builds a [`SourceFilter`] by prefixing identifiers with the corpus root.
#[derive(Debug, Clone)]
pub struct SourceFilterBuilder {
    corpus_root: String,
    empty_selection: EmptySelectionPolicy,
}

impl SourceFilterBuilder {
    pub fn new(corpus_root: impl Into<String>, empty_selection: EmptySelectionPolicy) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            empty_selection,
        }
    }

    pub fn corpus_root(&self) -> &str {
        &self.corpus_root
    }

    pub fn build(&self, identifiers: &BTreeSet<String>) -> SourceFilter {
        if identifiers.is_empty() && self.empty_selection == EmptySelectionPolicy::MatchAll {
            tracing::debug!("Empty selection, searching the whole corpus");
            return SourceFilter::Unrestricted;
        }

        let locators = identifiers
            .iter()
            .map(|id| format!("{}{}", self.corpus_root, id))
            .collect();

        SourceFilter::SourceIn(locators)
    }
}
