//! # loopkit
//!
//! A minimal tool-calling chat agent.
//!
//! This library provides:
//! - A "tools in a loop" agent: the LLM decides per turn whether to answer
//!   directly or request tool invocations
//! - A small fixed tool set (clock, calculator, note search, word counter)
//! - An OpenAI-compatible chat-completions client
//!
//! ## Architecture
//!
//! Each user turn starts a fresh conversation. The agent calls the LLM
//! with the conversation and the tool manifest; any requested tool calls
//! are executed in order and their results appended, then the LLM is
//! called again. A reply without tool calls ends the turn.
//!
//! Tool failures (unknown tool, bad arguments, handler errors) are
//! downgraded to textual tool results the model can react to; only
//! upstream engine failures abort a turn.
//!
//! ## Example
//!
//! ```rust,ignore
//! use loopkit::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config)?;
//! let outcome = agent.run_turn("What is sqrt(16) * 3?").await?;
//! println!("{}", outcome.text);
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
