pub mod action;
pub mod chrome;
pub mod combinations;
pub mod config;
pub mod driver;
pub mod harvester;
pub mod http;
pub mod keypath;
pub mod logging;
pub mod orchestrator;
pub mod selector;
pub mod utils;

// Re-export commonly used types
pub use action::{Action, ActionSequence, ActionType, IndexRange, RequestMethod, Target};
pub use config::EngineConfig;
pub use driver::{ApiClient, ApiResponse, ElementHandle, PageSession};
pub use harvester::{ExtractedRecord, HarvestOutcome, StopReason};
pub use logging::{MemoryLog, RunLog, TracingLog};
pub use orchestrator::{Orchestrator, RunContext, RunOutcome};
pub use selector::{ConcreteSelector, SelectorKind, SelectorTemplate};
pub use utils::error::EngineError;

pub type Result<T> = std::result::Result<T, EngineError>;
