//! Text statistics tool.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// Count words, characters, and sentences in a piece of text.
pub struct WordCounter;

#[async_trait]
impl Tool for WordCounter {
    fn name(&self) -> &str {
        "word_counter"
    }

    fn description(&self) -> &str {
        "Count the words, characters, and sentences in a piece of text."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to analyze"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'text' must be a string"))?;

        let words = text.split_whitespace().count();
        let characters = text.chars().count();
        let sentences = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();

        Ok(format!(
            "Words: {}, Characters: {}, Sentences: {}",
            words, characters, sentences
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_words_characters_and_sentences() {
        let out = WordCounter
            .execute(json!({ "text": "Hi. Bye!" }))
            .await
            .unwrap();
        assert_eq!(out, "Words: 2, Characters: 8, Sentences: 2");
    }

    #[tokio::test]
    async fn empty_text_counts_zero() {
        let out = WordCounter.execute(json!({ "text": "" })).await.unwrap();
        assert_eq!(out, "Words: 0, Characters: 0, Sentences: 0");
    }

    #[tokio::test]
    async fn each_terminator_counts_independently() {
        let out = WordCounter
            .execute(json!({ "text": "Really?! Yes..." }))
            .await
            .unwrap();
        assert_eq!(out, "Words: 2, Characters: 15, Sentences: 5");
    }
}
