//! Agent core: the control loop and everything it dispatches to
//!
//! The orchestrator runs planning, then turns: rebuild the prompt, call the
//! model, execute requested tool calls in order, fold the results back into
//! memory, repeat until a tool-call-free reply or the turn cap.

use thiserror::Error;

pub mod builtin;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod retrieval;

pub use orchestrator::{LoopSettings, Orchestrator, TurnOutcome};
pub use planner::{Plan, PlanStep, Planner};
pub use providers::WorkspaceProvider;
pub use registry::ProviderRegistry;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Model transport failure; propagates out of the turn loop unretried
    #[error("model call failed: {0}")]
    Provider(#[from] engram_provider::ProviderError),

    /// Plan output did not parse; the caller treats this as "no plan"
    #[error("plan generation failed: {0}")]
    Plan(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
