pub mod check;
pub mod enforce;
pub mod extract;
pub mod guardrail;
pub mod pipeline;
pub mod rationalize;
pub mod sanitize;
