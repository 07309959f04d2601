//! Prompt templates for RAG generation

use crate::chat::memory::ChatMessage;
use crate::types::{Category, DocType, DocumentStatus, SourceNode};

/// Maximum words kept from an extracted title
pub const MAX_TITLE_WORDS: usize = 20;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block from reranked passages
    pub fn build_context(nodes: &[SourceNode]) -> String {
        let mut context = String::new();

        for (i, node) in nodes.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}, Page {}\n\n{}\n\n---\n\n",
                i + 1,
                node.file_name,
                node.page_number,
                node.text_content
            ));
        }

        context
    }

    /// Grounded answer prompt with a polite persona
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            r#"We have the following context information:
---------------------
{context}
---------------------
Use ONLY the context information above to answer the question. Do not use any prior knowledge.
If the context does not contain the answer, say politely that the documents do not cover it.
Always answer in a polite and friendly tone, in the same language as the question.
Question: {question}
Answer: "#,
            context = context.trim_end(),
            question = question
        )
    }

    /// Rewrite a follow-up into a standalone question
    pub fn build_condense_prompt(history: &str, question: &str) -> String {
        format!(
            r#"Given the conversation history and the latest question, rewrite the latest question
as a complete question that can be understood on its own (a standalone question).
Resolve references such as "it", "that document" or "the second one" using the history.
Return only the standalone question.

Conversation history:
{history}
Latest question: {question}
Standalone question: "#,
            history = history,
            question = question
        )
    }

    /// Render history turns as `role: text` lines
    pub fn format_history(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Document classification prompt with the fixed taxonomy
    pub fn build_metadata_prompt(sample: &str) -> String {
        fn labels<T: std::fmt::Display>(values: &[T]) -> String {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }

        format!(
            r#"Classify the document below. Respond with a single JSON object and nothing else.

Fields:
- "doc_type": one of [{doc_types}]
- "category": one of [{categories}]
- "status": one of [{statuses}]
- "title": the document title, at most {max_words} words

Use "Unknown" for any field you cannot determine.

Example:
{{"doc_type": "Policy", "category": "HR", "status": "Published", "title": "Annual Leave Policy"}}

DOCUMENT:
{sample}

JSON:"#,
            doc_types = labels(DocType::ALL),
            categories = labels(Category::ALL),
            statuses = labels(DocumentStatus::ALL),
            max_words = MAX_TITLE_WORDS,
            sample = sample
        )
    }
}
