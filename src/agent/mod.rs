//! Agent module - the core conversational loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed a fresh conversation with the user message
//! 2. Call the LLM with the conversation and the tool manifest
//! 3. If the LLM requests tool calls, execute them in order and feed the
//!    results back
//! 4. Repeat until the LLM replies without tool calls

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, AgentError, StepEntry, TurnOutcome};
pub use prompt::SYSTEM_PROMPT;
