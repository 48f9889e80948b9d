#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use selfcheck_guard::{Completion, EvidenceChunk, Retriever};

/// Temperature the detector uses for sampling under the default config
pub const SAMPLE_TEMPERATURE: f32 = 1.0;

/// Scripted reply for one completion call
pub struct Reply {
    pub delay: Duration,
    pub text: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { delay: Duration::ZERO, text: Some(text.into()) }
    }

    pub fn fail() -> Self {
        Self { delay: Duration::ZERO, text: None }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
}

/// Fake completion driven by a closure over (prompt, temperature, call number)
pub struct ScriptedCompletion {
    handler: Box<dyn Fn(&str, f32, usize) -> Reply + Send + Sync>,
    counter: AtomicUsize,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new(handler: impl Fn(&str, f32, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_at(&self, temperature: f32) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.temperature == temperature)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(RecordedCall { prompt: prompt.to_string(), temperature });

        let reply = (self.handler)(prompt, temperature, n);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.text.ok_or_else(|| anyhow!("scripted transport failure on call {}", n))
    }
}

/// Naive entailment oracle for the default fact-check template: answers "Yes"
/// when every hypothesis word longer than three characters occurs in the
/// evidence, "No" otherwise.
pub fn entailment_oracle(prompt: &str) -> String {
    let evidence = section(prompt, "\"evidence\": ", "\n\"hypothesis\": ").to_lowercase();
    let hypothesis = section(prompt, "\"hypothesis\": ", "\n\"entails\":").to_lowercase();

    let supported = hypothesis
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .all(|w| evidence.contains(w));

    if supported {
        "Yes".to_string()
    } else {
        "No, the evidence does not mention it.".to_string()
    }
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
    let from = prompt.find(start).map(|i| i + start.len()).unwrap_or(0);
    let rest = &prompt[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    &rest[..to]
}

pub struct StaticRetriever {
    pub chunks: Option<Vec<EvidenceChunk>>,
}

impl StaticRetriever {
    pub fn with(texts: &[&str]) -> Self {
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, t)| EvidenceChunk::new(*t, 1.0 - i as f32 * 0.1))
            .collect();
        Self { chunks: Some(chunks) }
    }

    pub fn failing() -> Self {
        Self { chunks: None }
    }
}

#[async_trait::async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<EvidenceChunk>> {
        self.chunks.clone().ok_or_else(|| anyhow!("knowledge base unavailable"))
    }
}

pub const REPORT_CHUNK: &str = "Unemployment rate was 3.5% in March 2023";
