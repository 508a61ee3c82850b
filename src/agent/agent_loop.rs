//! Core agent loop implementation.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, LlmError, OpenAiClient};
use crate::tools::{default_registry, ToolError, ToolRegistry};

use super::prompt::SYSTEM_PROMPT;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Agent exceeded the configured iteration budget ({0})")]
    LoopBudgetExceeded(usize),
}

/// One step of a completed turn, in the order it occurred. Lets the shell's
/// verbose mode replay intermediate tool activity.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEntry {
    ToolCall { name: String, arguments: String },
    ToolResult { name: String, text: String },
    Response { text: String },
}

/// Outcome of a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant text. May be empty: a reply with no tool calls is
    /// terminal regardless of content.
    pub text: String,
    pub steps: Vec<StepEntry>,
}

/// The conversational agent: an LLM plus a fixed tool set, run in a loop.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl Agent {
    /// Create an agent backed by an OpenAI-compatible endpoint and the
    /// standard tool set.
    pub fn new(config: Config) -> Result<Self, ToolError> {
        let llm = Arc::new(OpenAiClient::new(
            config.api_key.clone(),
            config.base_url.clone(),
            SYSTEM_PROMPT,
        ));
        let tools = default_registry()?;
        Ok(Self { config, llm, tools })
    }

    /// Create an agent with an explicit client and registry. Used by tests
    /// to script engine behavior.
    pub fn with_client(config: Config, llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        Self { config, llm, tools }
    }

    /// The registered tool set.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one user turn to completion.
    ///
    /// A fresh conversation is seeded with the user message, then the loop
    /// alternates engine calls with tool execution until the engine replies
    /// without tool calls. Tool failures never abort the turn; only
    /// upstream engine errors (and the optional iteration budget) do.
    pub async fn run_turn(&self, input: &str) -> Result<TurnOutcome, AgentError> {
        let mut messages = vec![ChatMessage::user(input)];
        let manifest = self.tools.definitions();
        let mut steps = Vec::new();
        let mut iteration = 0usize;

        loop {
            iteration += 1;
            if let Some(cap) = self.config.max_iterations {
                if iteration > cap {
                    return Err(AgentError::LoopBudgetExceeded(cap));
                }
            }

            tracing::debug!(iteration, "calling reasoning engine");
            let response = self
                .llm
                .chat_completion(&self.config.model, &messages, Some(&manifest))
                .await?;

            let tool_calls = response.tool_calls.clone().unwrap_or_default();
            if tool_calls.is_empty() {
                // No tool calls means a final turn, even with empty text.
                let text = response.content.unwrap_or_default();
                steps.push(StepEntry::Response { text: text.clone() });
                return Ok(TurnOutcome { text, steps });
            }

            messages.push(response);

            // Execute in request order; one result per call, same order.
            for call in &tool_calls {
                tracing::info!(
                    tool = %call.function.name,
                    args = %call.function.arguments,
                    "executing tool call"
                );
                steps.push(StepEntry::ToolCall {
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                });

                let result = self.tools.dispatch(call).await;
                steps.push(StepEntry::ToolResult {
                    name: call.function.name.clone(),
                    text: result.content.clone().unwrap_or_default(),
                });
                messages.push(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FunctionCall, Role, ToolCall};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine stub that pops a scripted reply per call and records every
    /// conversation it was shown.
    struct ScriptedClient {
        script: Mutex<VecDeque<ChatMessage>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<ChatMessage>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[Value]>,
        ) -> Result<ChatMessage, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::MalformedResponse("script exhausted".to_string()))
        }
    }

    fn assistant_text(text: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: Some(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn assistant_calls(calls: Vec<(&str, &str, &str)>) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(
                calls
                    .into_iter()
                    .map(|(id, name, arguments)| ToolCall {
                        id: id.to_string(),
                        kind: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        }
    }

    fn agent_with_script(script: Vec<ChatMessage>) -> (Agent, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(script));
        let agent = Agent::with_client(
            Config::for_tests(),
            client.clone(),
            default_registry().unwrap(),
        );
        (agent, client)
    }

    #[tokio::test]
    async fn direct_answer_ends_the_loop() {
        let (agent, client) = agent_with_script(vec![assistant_text("hello there")]);
        let outcome = agent.run_turn("hi").await.unwrap();
        assert_eq!(outcome.text, "hello there");
        assert_eq!(
            outcome.steps,
            vec![StepEntry::Response {
                text: "hello there".to_string()
            }]
        );
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_reply_without_tool_calls_is_terminal() {
        let (agent, _) = agent_with_script(vec![ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: None,
            tool_call_id: None,
        }]);
        let outcome = agent.run_turn("hi").await.unwrap();
        assert_eq!(outcome.text, "");
    }

    #[tokio::test]
    async fn tool_results_are_appended_in_request_order() {
        let (agent, client) = agent_with_script(vec![
            assistant_calls(vec![
                ("call_1", "calculator", r#"{"expression":"2 + 2"}"#),
                ("call_2", "word_counter", r#"{"text":"Hi. Bye!"}"#),
            ]),
            assistant_text("done"),
        ]);

        let outcome = agent.run_turn("compute things").await.unwrap();
        assert_eq!(outcome.text, "done");
        assert_eq!(
            outcome.steps,
            vec![
                StepEntry::ToolCall {
                    name: "calculator".to_string(),
                    arguments: r#"{"expression":"2 + 2"}"#.to_string(),
                },
                StepEntry::ToolResult {
                    name: "calculator".to_string(),
                    text: "4".to_string(),
                },
                StepEntry::ToolCall {
                    name: "word_counter".to_string(),
                    arguments: r#"{"text":"Hi. Bye!"}"#.to_string(),
                },
                StepEntry::ToolResult {
                    name: "word_counter".to_string(),
                    text: "Words: 2, Characters: 8, Sentences: 2".to_string(),
                },
                StepEntry::Response {
                    text: "done".to_string()
                },
            ]
        );

        // Second engine call sees user, assistant, then one correlated
        // tool result per requested call, in request order.
        let seen = client.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[0].role, Role::User);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[2].role, Role::Tool);
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second[3].role, Role::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn unknown_tool_does_not_abort_the_turn() {
        let (agent, _) = agent_with_script(vec![
            assistant_calls(vec![("call_1", "frobnicate", "{}")]),
            assistant_text("recovered"),
        ]);

        let outcome = agent.run_turn("go").await.unwrap();
        assert_eq!(outcome.text, "recovered");
        assert!(outcome.steps.iter().any(|s| matches!(
            s,
            StepEntry::ToolResult { text, .. } if text == "Unknown tool: frobnicate"
        )));
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let (agent, _) = agent_with_script(vec![]);
        let err = agent.run_turn("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[tokio::test]
    async fn iteration_budget_is_enforced_when_configured() {
        let calls = || assistant_calls(vec![("call_1", "current_time", "{}")]);
        let client = Arc::new(ScriptedClient::new(vec![calls(), calls(), calls()]));
        let mut config = Config::for_tests();
        config.max_iterations = Some(2);
        let agent = Agent::with_client(config, client, default_registry().unwrap());

        let err = agent.run_turn("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::LoopBudgetExceeded(2)));
    }

    #[tokio::test]
    async fn identical_scripts_yield_identical_outcomes() {
        let script = || {
            vec![
                assistant_calls(vec![("call_1", "calculator", r#"{"expression":"sqrt(16) * 3"}"#)]),
                assistant_text("the answer is 12"),
            ]
        };

        let (first_agent, _) = agent_with_script(script());
        let (second_agent, _) = agent_with_script(script());

        let first = first_agent.run_turn("what is sqrt(16) * 3?").await.unwrap();
        let second = second_agent.run_turn("what is sqrt(16) * 3?").await.unwrap();

        assert_eq!(first, second);
    }
}
