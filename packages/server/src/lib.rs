// Coldline Outreach - API Core
//
// Backend for B2B cold-email outreach: lead ingestion, AI-generated
// icebreakers, and the self-resuming generation worker that turns many
// short invocations into one logically continuous batch job.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
