//! Icebreaker generation: the self-resuming batch worker that writes a
//! personalized opening line for every lead in a scrape job.

pub mod extract;
pub mod prompt;
pub mod store;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use store::{IcebreakerStore, PostgresIcebreakerStore};
pub use worker::{IcebreakerWorker, IcebreakerWorkerConfig, InvocationSummary};
