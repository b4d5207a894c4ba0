//! Chat messages → the single prompt opencode reads on stdin.

use super::models::ChatMessage;

pub fn build_prompt(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter_map(|m| {
            let label = match m.role.as_str() {
                "system" | "developer" => "System",
                "user" => "User",
                "assistant" => "Assistant",
                other => {
                    tracing::debug!(target: "ocbridge.http", role = other, "skipping message");
                    return None;
                }
            };
            let text = m.content.as_ref().map(|c| c.to_text()).unwrap_or_default();
            Some(format!("{label}: {text}"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
