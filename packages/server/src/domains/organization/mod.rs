pub mod models;

pub use models::icebreaker_context::IcebreakerContext;
