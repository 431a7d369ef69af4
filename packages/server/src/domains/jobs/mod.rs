pub mod models;

pub use models::scrape_job::{GenerationProgress, GenerationStatus, ScrapeJob};
