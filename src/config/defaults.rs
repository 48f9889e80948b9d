/// Default configuration constants for selfcheck-guard

// Self-consistency defaults
pub const DEFAULT_SAMPLE_COUNT: usize = 3;
pub const DEFAULT_CONSISTENCY_THRESHOLD: f32 = 0.5;
pub const DEFAULT_SAMPLE_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_VERIFICATION_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 8;
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 30_000;
// Share of the check timeout that sample generation may use, leaving the
// rest for scoring whatever samples finished
pub const SAMPLING_TIMEOUT_SHARE: f64 = 0.6;
// Stand-in deadline for timeouts too large to add to an `Instant` (~30 years)
pub const FAR_FUTURE: std::time::Duration = std::time::Duration::from_secs(86_400 * 365 * 30);

// Fact checking defaults
pub const DEFAULT_EVIDENCE_TOKEN_BUDGET: usize = 512;

// Upper bound for sampling temperature accepted by validation
pub const MAX_TEMPERATURE: f32 = 2.0;

// Rail messages
pub const DEFAULT_UNKNOWN_ANSWER_MESSAGE: &str = "I don't know the answer to that.";
pub const DEFAULT_HALLUCINATION_WARNING: &str =
    "The previous answer is prone to hallucination and may not be accurate. \
     Please double check the answer using additional sources.";

// Prompt placeholders
pub const EVIDENCE_PLACEHOLDER: &str = "{evidence}";
pub const HYPOTHESIS_PLACEHOLDER: &str = "{hypothesis}";
pub const SAMPLES_PLACEHOLDER: &str = "{samples}";

pub const DEFAULT_FACT_CHECK_TEMPLATE: &str = "You are given a task to identify if the hypothesis is grounded and entailed by the evidence.\n\
You will only use the contents of the evidence and not rely on external knowledge.\n\
Answer with yes/no.\n\
\"evidence\": {evidence}\n\
\"hypothesis\": {hypothesis}\n\
\"entails\":";

pub const DEFAULT_CONSISTENCY_TEMPLATE: &str = "You are given a task to identify if the hypothesis is in agreement with the context below.\n\
You will only use the contents of the context and not rely on external knowledge.\n\
Answer with yes/no.\n\
\"context\": {evidence}\n\
\"hypothesis\": {hypothesis}\n\
\"agreement\":";

pub const DEFAULT_BATCHED_CONSISTENCY_TEMPLATE: &str = "You are given a task to identify, for each numbered context below, if the hypothesis is in agreement with that context.\n\
You will only use the contents of the contexts and not rely on external knowledge.\n\
Answer with one line per context in the form \"<number>: yes\" or \"<number>: no\".\n\
\"contexts\":\n{samples}\n\
\"hypothesis\": {hypothesis}\n\
\"agreement\":";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_DIR_NAME: &str = "selfcheck-guard";
pub const CONFIG_FILENAME: &str = "config.toml";
