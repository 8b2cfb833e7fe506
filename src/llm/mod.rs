//! LLM client built on `rig-core`, replacing the teacher's workspace-internal
//! `kodegen_candle_agent`/`CandleFluentAi` streaming client (not a fetchable
//! crate) with the provider/agent/prompt call shape shown in
//! `fourthplaces-mntogether`'s `kernel/ai.rs` and
//! `organization/effects/ai_effects.rs`.

mod client;
mod structured;
pub mod token_limit;

pub use client::LlmClient;
pub use structured::{Promptable, StructuredOutcome, call_structured};
pub use token_limit::{Message, Role, is_token_limit_exceeded, model_token_limit, remove_up_to_last_assistant};
