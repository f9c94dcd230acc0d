//! Ask command handler.
//!
//! Answers one question through the same pipeline the HTTP endpoint uses.

use clap::Args;
use codelogic_core::{config::AppConfig, AppResult};
use codelogic_grounding::{AnswerService, ChatRequest, ChatResponse};

/// Ask a question against the selected building codes
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Category codes to search, comma separated (e.g. IBC,IFC)
    #[arg(short, long, value_delimiter = ',')]
    pub docs: Vec<String>,

    /// Output as JSON (same shape as the HTTP response)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;

        let service = AnswerService::from_config(config).await?;

        let request = ChatRequest::new(self.question.clone()).with_selected_docs(self.docs.clone());
        let response = service.handle("POST", request).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print!("{}", render_text(&response));
        }

        Ok(())
    }
}

/// Plain-text rendering: the answer followed by a numbered source list.
fn render_text(response: &ChatResponse) -> String {
    let mut out = format!("{}\n", response.text.trim_end());

    if !response.source_documents.is_empty() {
        out.push_str("\nSources:\n");
        for (i, doc) in response.source_documents.iter().enumerate() {
            let snippet: String = doc.page_content.chars().take(120).collect();
            out.push_str(&format!(
                "  [{}] {}\n      {}\n",
                i + 1,
                doc.source().unwrap_or("unknown"),
                snippet.replace('\n', " ")
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelogic_grounding::RetrievedDocument;

    #[test]
    fn test_render_text_lists_sources() {
        let response = ChatResponse {
            text: "44 inches.\n".to_string(),
            source_documents: vec![RetrievedDocument::new(
                "Corridors\nshall be 44 inches.",
                "docs/International_Building_Code_2021.pdf",
            )],
        };

        let text = render_text(&response);
        assert!(text.starts_with("44 inches.\n\nSources:\n"));
        assert!(text.contains("[1] docs/International_Building_Code_2021.pdf"));
        assert!(text.contains("Corridors shall be 44 inches."));
    }

    #[test]
    fn test_render_text_without_sources() {
        let response = ChatResponse {
            text: "I don't know.".to_string(),
            source_documents: Vec::new(),
        };
        assert_eq!(render_text(&response), "I don't know.\n");
    }
}
