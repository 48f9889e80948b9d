pub mod actions;

pub use actions::{BotMessage, MessageId, RailAction};

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{GuardConfig, RailsConfig};
use crate::llm::Completion;
use crate::retrieval::Retriever;
use crate::verification::{
    Claim, ConsistencyVerdict, FactChecker, FactVerdict, GateLabel, HallucinationDetector,
};

/// Result of reviewing one bot message. No actions means the answer stands.
#[derive(Debug, Clone, Serialize)]
pub struct RailOutcome {
    pub actions: Vec<RailAction>,
    pub fact: Option<FactVerdict>,
    pub consistency: Option<ConsistencyVerdict>,
}

impl RailOutcome {
    pub fn is_retracted(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, RailAction::Retract { .. }))
    }
}

/// Output rails: fact-check and self-consistency review of bot answers
pub struct Guard {
    rails: RailsConfig,
    retriever: Arc<dyn Retriever>,
    fact_checker: FactChecker,
    detector: HallucinationDetector,
}

impl Guard {
    pub fn new(config: &GuardConfig, completion: Arc<dyn Completion>, retriever: Arc<dyn Retriever>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            rails: config.rails.clone(),
            retriever,
            fact_checker: FactChecker::new(completion.clone(), &config.checks, &config.prompts)?,
            detector: HallucinationDetector::new(completion, &config.checks, &config.prompts)?,
        })
    }

    pub fn fact_checker(&self) -> &FactChecker {
        &self.fact_checker
    }

    pub fn detector(&self) -> &HallucinationDetector {
        &self.detector
    }

    /// Run the enabled rails concurrently and decide what to do with the message.
    ///
    /// A failed fact check retracts the answer and speaks the unknown-answer
    /// message; a failed consistency check on a surviving answer annotates it.
    pub async fn review(&self, message: &BotMessage) -> RailOutcome {
        let claim = Claim::new(message.answer.as_str());

        let fact_check = async {
            if self.rails.fact_checking {
                Some(
                    self.fact_checker
                        .check_query(&claim, &message.question, self.retriever.as_ref())
                        .await,
                )
            } else {
                None
            }
        };
        let consistency_check = async {
            if self.rails.hallucination_detection {
                Some(self.detector.check(&claim, &message.prompt).await)
            } else {
                None
            }
        };
        let (fact, consistency) = tokio::join!(fact_check, consistency_check);

        let mut actions = Vec::new();

        if let Some(verdict) = &fact {
            if self.fails(verdict.label) {
                info!("Retracting message {}: fact check {:?}", message.id, verdict.label);
                actions.push(RailAction::Retract { message_id: message.id });
                actions.push(RailAction::Speak { text: self.rails.unknown_answer_message.clone() });
            }
        }

        if let Some(verdict) = &consistency {
            if actions.is_empty() && self.fails(verdict.label) {
                info!("Annotating message {}: consistency check {:?}", message.id, verdict.label);
                actions.push(RailAction::Annotate {
                    message_id: message.id,
                    note: self.rails.hallucination_warning.clone(),
                });
            }
        }

        debug!("Review of message {} produced {} actions", message.id, actions.len());
        RailOutcome { actions, fact, consistency }
    }

    fn fails(&self, label: impl GateLabel) -> bool {
        if label.is_inconclusive() {
            self.rails.inconclusive_is_failure
        } else {
            !label.passes()
        }
    }
}
