//! Deterministic `TextGenerator` for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{GenerationFailure, TextGenerator};

type Responder = Box<dyn Fn(&str) -> Result<String, GenerationFailure> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<String, GenerationFailure>>>),
    Responder(Responder),
}

/// A generator that replays a script and records every prompt it receives.
pub struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Replay `responses` in order; once exhausted every call is `Unavailable`.
    pub fn from_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GenerationFailure>>,
    {
        Self {
            script: Script::Queue(Mutex::new(results.into_iter().collect())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer each prompt with `f(prompt)`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, GenerationFailure> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(f)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator for which every call fails with `failure`.
    pub fn failing(failure: GenerationFailure) -> Self {
        Self::from_fn(move |_| Err(failure.clone()))
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationFailure> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| {
                    Err(GenerationFailure::Unavailable("script exhausted".to_string()))
                }),
            Script::Responder(f) => f(prompt),
        }
    }
}
