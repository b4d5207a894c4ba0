use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Kill,
    Term,
}

#[derive(Debug, Clone, Default)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
    pub cwd: Option<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin_payload: Option<String>,
}
