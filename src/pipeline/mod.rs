//! The response pipeline: safety filter → rule matcher → generative fallback.

pub mod processor;
pub mod rules;
pub mod safety;
pub mod types;

pub use processor::ResponsePipeline;
pub use rules::RuleTable;
pub use safety::SafetyFilter;
pub use types::{ChatMessage, PipelineReply, ReplySource};
