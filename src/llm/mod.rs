use anyhow::Result;
use std::sync::Arc;

/// Text-completion collaborator.
///
/// This is the only way the checks reach a language model. Transport,
/// retries and rate limiting belong to the implementor; an `Err` here is
/// treated as "this call produced no result".
#[async_trait::async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: Completion + ?Sized> Completion for Arc<T> {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).complete(prompt, temperature).await
    }
}
