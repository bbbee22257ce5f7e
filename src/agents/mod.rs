//! Agent assembly and dispatch
//!
//! The pipeline for one chat turn: the [`invoker::AgentInvoker`] validates
//! the request, resolves the caller's agent settings, asks the
//! [`factory::AgentFactory`] for a [`finance::FinanceAgent`] bound to the
//! configured model and tool set, renders the system prompt with
//! [`prompt::format_prompt`], and dispatches the message under a timeout.
//!
//! The agent itself runs the bounded tool loop: call the model, execute any
//! requested tools, feed results back, and stop at the first plain reply.

/// Agent construction from resolved settings.
pub mod factory;
/// The tool-calling chat agent.
pub mod finance;
/// Request validation, settings resolution, and dispatch.
pub mod invoker;
/// System prompt placeholder rendering.
pub mod prompt;

pub use factory::AgentFactory;
pub use finance::FinanceAgent;
pub use invoker::AgentInvoker;
pub use prompt::format_prompt;
