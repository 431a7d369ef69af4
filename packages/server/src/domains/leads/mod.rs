pub mod models;

pub use models::lead::{Lead, LeadStatus, NewLead};
