pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod normalize;
pub mod extract;
pub mod load;
pub mod retrieve;
pub mod analyze;
pub mod prompt;
pub mod completion;
pub mod assistant;

pub use config::Config;
pub use error::{FinbotError, Result};
pub use analyze::{analyze, Analysis, SymbolicAnswer};
pub use assistant::{Assistant, AssistantSettings, Transcript};
pub use completion::{Completer, OllamaClient};
pub use retrieve::{retrieve, NO_RELEVANT_DATA};
