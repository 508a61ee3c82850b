//! Fixed system prompt for the agent.

/// Sent once per engine call by the LLM client; never stored in the
/// accumulated conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. \
Use the available tools when they can help answer the user's question. \
Always explain your reasoning briefly before giving a final answer.";
