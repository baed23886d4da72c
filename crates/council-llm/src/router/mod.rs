//! Router - provider trait and test double
//!
//! Council talks to exactly one provider per run, so there is no routing
//! table here; the module keeps the provider seam and the scripted mock.

mod mock;
mod provider;

pub use mock::MockProvider;
pub use provider::LlmProvider;
