use std::collections::HashMap;

use anyhow::Result;

use crate::runner::{RunnerPlugin, RunnerStartArgs};

/// Appended to every prompt so the answer can be told apart from the tool's own
/// console output.
pub const WRAP_INSTRUCTION: &str = "\n\nIMPORTANT: Wrap your entire response in <opencode_output></opencode_output> tags. Put ALL your output content inside these tags.";

pub struct BackendPlan {
    pub runner: Box<dyn RunnerPlugin>,
    pub session_args: RunnerStartArgs,
}

/// Request parameters for backend planning
#[derive(Debug, Clone, Default)]
pub struct BackendPlanRequest {
    /// The prompt as built from the chat messages, before wrapping.
    pub prompt: String,
    /// Environment the child inherits; the backend may extend it.
    pub base_envs: HashMap<String, String>,
}

pub trait BackendStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn plan(&self, request: BackendPlanRequest) -> Result<BackendPlan>;
}

pub fn wrap_prompt(prompt: &str) -> String {
    let mut wrapped = String::with_capacity(prompt.len() + WRAP_INSTRUCTION.len());
    wrapped.push_str(prompt);
    wrapped.push_str(WRAP_INSTRUCTION);
    wrapped
}
