//! Note search tool over a small built-in knowledge base.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

// Placeholder knowledge base. Swap for a real store (file search, vector
// lookup) when one exists.
const NOTES: &[(&str, &str)] = &[
    (
        "agents",
        "Agents use a language model to decide which actions to take and in what order.",
    ),
    (
        "tools",
        "Tools are functions an agent can call to interact with the outside world.",
    ),
    (
        "prompts",
        "A system prompt sets the assistant's role and ground rules for every conversation.",
    ),
];

/// Search saved notes by keyword.
pub struct SearchNotes;

#[async_trait]
impl Tool for SearchNotes {
    fn name(&self) -> &str {
        "search_notes"
    }

    fn description(&self) -> &str {
        "Search through saved notes by topic keyword. Returns the text of every matching note."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'query' must be a string"))?
            .to_lowercase();

        let matches: Vec<&str> = NOTES
            .iter()
            .filter(|(key, _)| key.to_lowercase().contains(&query))
            .map(|(_, text)| *text)
            .collect();

        if matches.is_empty() {
            Ok("No matching notes found.".to_string())
        } else {
            Ok(matches.join("\n"))
        }
    }
}
