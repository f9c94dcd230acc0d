//! Request, response and document types for grounded question answering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key carrying a passage's source locator.
pub const SOURCE_KEY: &str = "source";

/// A passage returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Passage text
    #[serde(rename = "pageContent")]
    pub page_content: String,

    /// Index metadata; always includes `source` for corpus passages
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Create a document with only a source locator in its metadata.
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    /// Source locator of this passage, if the index recorded one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }
}

/// One prior exchange. On the wire this is a two-element array `[question, answer]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<(String, String)> for ConversationTurn {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

impl From<ConversationTurn> for (String, String) {
    fn from(turn: ConversationTurn) -> Self {
        (turn.question, turn.answer)
    }
}

/// Chat request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question; validated by the orchestrator
    #[serde(default)]
    pub question: Option<String>,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,

    /// Category codes narrowing the corpus
    #[serde(rename = "selectedDocs", default)]
    pub selected_docs: Vec<String>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_selected_docs<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_docs = codes.into_iter().map(Into::into).collect();
        self
    }
}

/// Successful chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer
    pub text: String,

    /// Exactly the passages the retriever handed to the generator, in order
    #[serde(rename = "sourceDocuments")]
    pub source_documents: Vec<RetrievedDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_from_wire_shape() {
        let request: ChatRequest = serde_json::from_value(json!({
            "question": "Minimum corridor width?",
            "history": [["What is IBC?", "The International Building Code."]],
            "selectedDocs": ["IBC", "ADA"]
        }))
        .unwrap();

        assert_eq!(request.question.as_deref(), Some("Minimum corridor width?"));
        assert_eq!(
            request.history,
            vec![ConversationTurn::new(
                "What is IBC?",
                "The International Building Code."
            )]
        );
        assert_eq!(request.selected_docs, vec!["IBC", "ADA"]);
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.question.is_none());
        assert!(request.history.is_empty());
        assert!(request.selected_docs.is_empty());
    }

    #[test]
    fn test_turn_rejects_wrong_arity() {
        let result: Result<ChatRequest, _> = serde_json::from_value(json!({
            "question": "q",
            "history": [["only one"]]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_wire_shape() {
        let response = ChatResponse {
            text: "36 inches".to_string(),
            source_documents: vec![RetrievedDocument::new(
                "Stairways shall be not less than 36 inches.",
                "docs/International_Building_Code_2021.pdf",
            )],
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "text": "36 inches",
                "sourceDocuments": [{
                    "pageContent": "Stairways shall be not less than 36 inches.",
                    "metadata": {"source": "docs/International_Building_Code_2021.pdf"}
                }]
            })
        );
    }

    #[test]
    fn test_document_source() {
        let doc = RetrievedDocument::new("text", "docs/a.pdf");
        assert_eq!(doc.source(), Some("docs/a.pdf"));

        let bare = RetrievedDocument {
            page_content: "text".to_string(),
            metadata: Map::new(),
        };
        assert_eq!(bare.source(), None);
    }
}
