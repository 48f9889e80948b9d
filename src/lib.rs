pub mod config;
pub mod errors;
pub mod guard;
pub mod llm;
pub mod prompts;
pub mod retrieval;
pub mod telemetry;
pub mod verification;

// Re-export commonly used types
pub use config::{GuardConfig, CheckConfig, RailsConfig, PromptConfig, LoggingConfig, ScoringMode};
pub use errors::{CheckError, ConfigError};
pub use guard::{Guard, BotMessage, MessageId, RailAction, RailOutcome};
pub use llm::Completion;
pub use retrieval::{EvidenceChunk, Retriever};
pub use telemetry::init_logging;
pub use verification::{
    Claim,
    ConsistencyLabel,
    ConsistencyVerdict,
    FactChecker,
    FactLabel,
    FactVerdict,
    HallucinationDetector,
    Verdict,
};
