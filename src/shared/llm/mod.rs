//! Lenient parsing of language-model replies.
//!
//! Models are asked for a bare JSON object but routinely wrap it in code fences,
//! add prose around it, or emit slightly broken JSON. This module recovers the
//! object where possible and otherwise hands the caller a typed fallback.

mod parser;
mod response;

pub use parser::parse_with_fallback;
pub use response::LlmResponse;
