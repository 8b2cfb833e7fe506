//! Reflection Tool (spec §4.6): a single zero-I/O primitive exposed to
//! planning agents. Grounded in the teacher's per-capability tool structs
//! (one struct per capability, `async fn execute`), minus any
//! browser/MCP-specific plumbing those structs carried.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ReflectionInput {
    pub reflection: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReflectionAck {
    pub acknowledged: bool,
    pub reflection_length: usize,
}

/// Its existence is a contract: the planner calls it between search rounds,
/// creating a deliberate serialization point for decision-making. It has no
/// side effects of its own.
pub struct ReflectionTool;

impl ReflectionTool {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, input: ReflectionInput) -> ReflectionAck {
        ReflectionAck {
            acknowledged: true,
            reflection_length: input.reflection.chars().count(),
        }
    }
}

impl Default for ReflectionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acknowledges_and_counts_chars() {
        let tool = ReflectionTool::new();
        let ack = tool
            .execute(ReflectionInput {
                reflection: "I should search for pricing data next.".to_string(),
            })
            .await;
        assert!(ack.acknowledged);
        assert_eq!(ack.reflection_length, 39);
    }
}
