use anyhow::Result;
use futures::{stream, Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::defaults::{FAR_FUTURE, SAMPLING_TIMEOUT_SHARE};
use crate::config::{CheckConfig, PromptConfig, ScoringMode};
use crate::errors::CheckError;
use crate::llm::Completion;
use crate::prompts::{format_numbered_samples, parse_numbered_yes_no, parse_yes_no, render};
use crate::verification::verdict::{
    Claim, ConsistencyLabel, ConsistencyStats, ConsistencyVerdict, SampleSet,
};

/// Self-consistency hallucination detector.
///
/// Regenerates the prompt several times with sampling enabled, asks the model
/// whether each regeneration agrees with the original answer, and flags the
/// answer when the disagreeing fraction reaches the configured threshold.
pub struct HallucinationDetector {
    completion: Arc<dyn Completion>,
    config: CheckConfig,
    consistency_template: String,
    batched_template: String,
}

/// Outcome of a deadline-bounded collection
struct Collected<T> {
    items: Vec<T>,
    timed_out: bool,
}

impl HallucinationDetector {
    pub fn new(completion: Arc<dyn Completion>, checks: &CheckConfig, prompts: &PromptConfig) -> Result<Self> {
        checks.validate()?;
        prompts.validate()?;

        Ok(Self {
            completion,
            config: checks.clone(),
            consistency_template: prompts.consistency.clone(),
            batched_template: prompts.batched_consistency.clone(),
        })
    }

    /// Check `answer` using the configured sample count and timeout
    pub async fn check(&self, answer: &Claim, prompt: &str) -> ConsistencyVerdict {
        self.run(answer, prompt, self.config.sample_count, self.config.check_timeout()).await
    }

    pub async fn check_with_samples(&self, answer: &Claim, prompt: &str, sample_count: usize) -> ConsistencyVerdict {
        self.run(answer, prompt, sample_count, self.config.check_timeout()).await
    }

    /// Check under an explicit deadline. Work finished before the deadline is
    /// still aggregated, at low confidence.
    pub async fn check_with_deadline(&self, answer: &Claim, prompt: &str, timeout: Duration) -> ConsistencyVerdict {
        self.run(answer, prompt, self.config.sample_count, timeout).await
    }

    async fn run(&self, answer: &Claim, prompt: &str, sample_count: usize, timeout: Duration) -> ConsistencyVerdict {
        if sample_count == 0 {
            warn!("Consistency check requested with zero samples");
            return ConsistencyVerdict::inconclusive(CheckError::insufficient("sample_count must be at least 1"));
        }
        if sample_count == 1 {
            warn!("Consistency check with a single sample degenerates to direct comparison; low confidence");
        }

        let started = Instant::now();
        let deadline = deadline_after(started, timeout);
        let sampling_share = Duration::try_from_secs_f64(timeout.as_secs_f64() * SAMPLING_TIMEOUT_SHARE)
            .unwrap_or(timeout);
        let sampling_deadline = deadline_after(started, sampling_share);
        let min_required = sample_count.min(2);
        let mut stats = ConsistencyStats { requested: sample_count, ..Default::default() };

        // Fan out, then join before scoring
        let sampled = self.generate_samples(prompt, sample_count, sampling_deadline).await;
        stats.generated = sampled.items.len();

        if sampled.items.len() < min_required {
            let cause = if sampled.timed_out {
                CheckError::DeadlineExceeded { completed: sampled.items.len() }
            } else {
                CheckError::insufficient(format!(
                    "only {} of {} samples generated",
                    sampled.items.len(),
                    sample_count
                ))
            };
            return ConsistencyVerdict::inconclusive(cause).with_stats(stats);
        }

        let scored = match self.config.scoring_mode {
            ScoringMode::PerSample => self.score_each(answer, &sampled.items, deadline).await,
            ScoringMode::Batched => self.score_batched(answer, &sampled.items, deadline).await,
        };
        stats.scored = scored.items.len();
        stats.inconsistent = scored.items.iter().filter(|consistent| !**consistent).count();

        let timed_out = sampled.timed_out || scored.timed_out;
        let completed = stats.generated + stats.scored;

        let Some((label, fraction)) = aggregate(&scored.items, self.config.consistency_threshold)
            .filter(|_| scored.items.len() >= min_required)
        else {
            let cause = if timed_out {
                CheckError::DeadlineExceeded { completed }
            } else {
                CheckError::insufficient(format!(
                    "only {} of {} samples scored",
                    scored.items.len(),
                    stats.generated
                ))
            };
            return ConsistencyVerdict::inconclusive(cause).with_stats(stats);
        };

        debug!(
            "Consistency check completed: {:?}, {}/{} samples inconsistent (fraction {:.3}, threshold {:.3})",
            label, stats.inconsistent, stats.scored, fraction, self.config.consistency_threshold
        );

        let mut verdict = ConsistencyVerdict::new(label)
            .with_score(fraction)
            .with_stats(stats)
            .with_low_confidence(sample_count < 2 || timed_out)
            .with_rationale(Some(format!(
                "{} of {} sampled answers disagree with the original answer",
                stats.inconsistent, stats.scored
            )));
        if timed_out {
            verdict.degraded = Some(CheckError::DeadlineExceeded { completed });
        }
        verdict
    }

    async fn generate_samples(&self, prompt: &str, sample_count: usize, deadline: Instant) -> Collected<String> {
        let temperature = self.config.sample_temperature;
        let calls = (0..sample_count).map(|i| async move { (i, self.completion.complete(prompt, temperature).await) });
        let results = collect_until(
            stream::iter(calls).buffer_unordered(self.config.max_concurrent_calls),
            deadline,
        )
        .await;

        if results.timed_out {
            warn!(
                "Sample generation hit the deadline with {} of {} calls finished",
                results.items.len(),
                sample_count
            );
        }

        let mut samples: SampleSet = Vec::with_capacity(results.items.len());
        for (i, result) in results.items {
            match result {
                Ok(text) if !text.trim().is_empty() => samples.push(text),
                Ok(_) => debug!("Sample {} came back empty; excluded", i),
                Err(e) => warn!("Sample {} generation failed; excluded: {:#}", i, e),
            }
        }

        Collected { items: samples, timed_out: results.timed_out }
    }

    /// One yes/no call per sample, issued concurrently
    async fn score_each(&self, answer: &Claim, samples: &[String], deadline: Instant) -> Collected<bool> {
        let temperature = self.config.verification_temperature;
        let calls = samples.iter().enumerate().map(|(i, sample)| {
            let prompt = render(
                &self.consistency_template,
                &[("evidence", sample.as_str()), ("hypothesis", answer.as_str())],
            );
            async move { (i, self.completion.complete(&prompt, temperature).await) }
        });
        let results = collect_until(
            stream::iter(calls).buffer_unordered(self.config.max_concurrent_calls),
            deadline,
        )
        .await;

        let mut flags = Vec::with_capacity(results.items.len());
        for (i, result) in results.items {
            match result.map_err(|e| CheckError::transport(&e)).and_then(|r| parse_yes_no(&r)) {
                Ok(answer) => flags.push(answer.affirmative),
                Err(cause) => warn!("Consistency scoring for sample {} excluded: {}", i, cause),
            }
        }

        Collected { items: flags, timed_out: results.timed_out }
    }

    /// A single call scoring every sample
    async fn score_batched(&self, answer: &Claim, samples: &[String], deadline: Instant) -> Collected<bool> {
        let numbered = format_numbered_samples(samples);
        let prompt = render(
            &self.batched_template,
            &[("samples", numbered.as_str()), ("hypothesis", answer.as_str())],
        );

        let response = match timeout_at(deadline, self.completion.complete(&prompt, self.config.verification_temperature)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Batched consistency scoring failed: {:#}", e);
                return Collected { items: Vec::new(), timed_out: false };
            }
            Err(_) => {
                warn!("Batched consistency scoring hit the deadline");
                return Collected { items: Vec::new(), timed_out: true };
            }
        };

        let parsed = parse_numbered_yes_no(&response, samples.len());
        let missing = parsed.iter().filter(|flag| flag.is_none()).count();
        if missing > 0 {
            warn!("Batched consistency response left {} of {} samples unscored", missing, samples.len());
        }

        Collected { items: parsed.into_iter().flatten().collect(), timed_out: false }
    }
}

/// Aggregate per-sample consistency flags (`true` = consistent).
///
/// Returns the label and the inconsistent fraction, or `None` for no flags.
/// The comparison is inclusive, so a fraction equal to the threshold is
/// flagged. Only counts are used, so sample order has no effect.
pub fn aggregate(flags: &[bool], threshold: f32) -> Option<(ConsistencyLabel, f32)> {
    if flags.is_empty() {
        return None;
    }

    let inconsistent = flags.iter().filter(|consistent| !**consistent).count();
    let fraction = inconsistent as f32 / flags.len() as f32;
    let label = if fraction >= threshold {
        ConsistencyLabel::Inconsistent
    } else {
        ConsistencyLabel::Consistent
    };

    Some((label, fraction))
}

/// `started + timeout`, saturating to a far-future instant for timeouts
/// that overflow `Instant`
fn deadline_after(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// Drain `stream` until it ends or `deadline` passes. Dropping the stream on
/// return cancels whatever is still in flight.
async fn collect_until<T>(stream: impl Stream<Item = T>, deadline: Instant) -> Collected<T> {
    let mut stream = pin!(stream);
    let mut items = Vec::new();

    loop {
        match timeout_at(deadline, stream.next()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => return Collected { items, timed_out: false },
            Err(_) => return Collected { items, timed_out: true },
        }
    }
}
