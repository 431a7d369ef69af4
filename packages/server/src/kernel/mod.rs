pub mod deps;
pub mod dispatcher;
pub mod traits;

pub use deps::{OpenAiAdapter, ServerDeps};
pub use dispatcher::{IcebreakerDispatcher, IcebreakerDispatcherConfig};
pub use traits::BaseAI;
