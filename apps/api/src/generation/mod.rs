//! Generation pipeline: prompt construction, model invocation, heading-based
//! section matching, and the degraded-content fallbacks.

pub mod fallback;
pub mod prompts;
pub mod sections;
pub mod worker;
