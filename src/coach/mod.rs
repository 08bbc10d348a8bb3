pub mod fallback;
pub mod orchestrator;

pub use fallback::fallback_response;
pub use orchestrator::{ ChatOrchestrator, SubmitOutcome };
