pub mod health;
pub mod icebreakers;
pub mod leads;

pub use health::health_handler;
pub use icebreakers::generate_icebreakers_handler;
pub use leads::import_leads_handler;
