use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CheckConfig, PromptConfig};
use crate::errors::CheckError;
use crate::llm::Completion;
use crate::prompts::{pack_evidence, parse_yes_no, render};
use crate::retrieval::{EvidenceChunk, Retriever};
use crate::verification::verdict::{Claim, FactLabel, FactVerdict};

/// Checks whether a claim is entailed by retrieved knowledge-base evidence
pub struct FactChecker {
    completion: Arc<dyn Completion>,
    template: String,
    evidence_token_budget: usize,
    temperature: f32,
}

impl FactChecker {
    pub fn new(completion: Arc<dyn Completion>, checks: &CheckConfig, prompts: &PromptConfig) -> Result<Self> {
        checks.validate()?;
        prompts.validate()?;

        Ok(Self {
            completion,
            template: prompts.fact_check.clone(),
            evidence_token_budget: checks.evidence_token_budget,
            temperature: checks.verification_temperature,
        })
    }

    /// Judge `claim` against `evidence`.
    ///
    /// Empty evidence, transport failures and replies outside the yes/no
    /// vocabulary all come back as `Inconclusive`.
    pub async fn check(&self, claim: &Claim, evidence: &[EvidenceChunk]) -> FactVerdict {
        if evidence.is_empty() {
            debug!("Fact check skipped: no evidence for claim");
            return FactVerdict::inconclusive(CheckError::insufficient("no evidence chunks supplied"));
        }

        let packed = pack_evidence(evidence, self.evidence_token_budget);
        if packed.is_empty() {
            return FactVerdict::inconclusive(CheckError::insufficient("evidence chunks are blank"));
        }
        debug!(
            "Fact check context: {} of {} chunks, {} tokens{}",
            packed.chunks_used,
            evidence.len(),
            packed.tokens,
            if packed.truncated { " (truncated)" } else { "" }
        );

        let prompt = render(
            &self.template,
            &[("evidence", packed.context.as_str()), ("hypothesis", claim.as_str())],
        );

        let response = match self.completion.complete(&prompt, self.temperature).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fact check completion failed: {:#}", e);
                return FactVerdict::inconclusive(CheckError::transport(&e));
            }
        };

        match parse_yes_no(&response) {
            Ok(answer) if answer.affirmative => FactVerdict::new(FactLabel::Supported)
                .with_score(1.0)
                .with_rationale(answer.rationale),
            Ok(answer) => FactVerdict::new(FactLabel::Unsupported)
                .with_score(0.0)
                .with_rationale(answer.rationale),
            Err(cause) => {
                warn!("Fact check response did not match yes/no: {:?}", response);
                FactVerdict::inconclusive(cause)
            }
        }
    }

    /// Retrieve evidence for `query`, then check `claim` against it.
    /// A failed retrieval is treated as empty evidence.
    pub async fn check_query(&self, claim: &Claim, query: &str, retriever: &dyn Retriever) -> FactVerdict {
        let evidence = match retriever.retrieve(query).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Evidence retrieval failed: {:#}", e);
                return FactVerdict::inconclusive(CheckError::insufficient(format!("retrieval failed: {:#}", e)));
            }
        };

        self.check(claim, &evidence).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedCompletion {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl CannedCompletion {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait::async_trait]
    impl Completion for CannedCompletion {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("connection reset"))
        }
    }

    fn checker(completion: Arc<CannedCompletion>) -> FactChecker {
        FactChecker::new(completion, &CheckConfig::default(), &PromptConfig::default()).unwrap()
    }

    fn evidence() -> Vec<EvidenceChunk> {
        vec![EvidenceChunk::new("Unemployment rate was 3.5% in March 2023", 0.9)]
    }

    #[tokio::test]
    async fn test_empty_evidence_skips_completion() {
        let completion = CannedCompletion::new(Some("yes"));
        let verdict = checker(completion.clone()).check(&Claim::from("anything"), &[]).await;

        assert_eq!(verdict.label, FactLabel::Inconclusive);
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_response_is_inconclusive() {
        let completion = CannedCompletion::new(Some("It depends on the month."));
        let verdict = checker(completion.clone()).check(&Claim::from("claim"), &evidence()).await;

        assert_eq!(verdict.label, FactLabel::Inconclusive);
        assert!(matches!(verdict.degraded, Some(CheckError::Parse { .. })));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_inconclusive() {
        let verdict = checker(CannedCompletion::new(None)).check(&Claim::from("claim"), &evidence()).await;

        assert_eq!(verdict.label, FactLabel::Inconclusive);
        assert!(matches!(verdict.degraded, Some(CheckError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_yes_and_no_map_to_labels() {
        let supported = checker(CannedCompletion::new(Some("Yes."))).check(&Claim::from("c"), &evidence()).await;
        assert_eq!(supported.label, FactLabel::Supported);
        assert_eq!(supported.score, Some(1.0));

        let unsupported = checker(CannedCompletion::new(Some("no"))).check(&Claim::from("c"), &evidence()).await;
        assert_eq!(unsupported.label, FactLabel::Unsupported);
        assert_eq!(unsupported.score, Some(0.0));
    }
}
