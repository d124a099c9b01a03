//! Parameterized, deadline-bound query execution.

mod dispatcher;
mod template;

pub use dispatcher::{QueryDispatcher, QueryOutcome};
pub use template::QueryTemplate;
