//! Scripted mocks for the three trait boundaries the pipeline depends on:
//! `TextGenerator`, `EvidenceSource`, and `WeatherSource`. All count their
//! calls so tests can assert that cached paths perform no new work.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::error::PipelineError;
use crate::llm::TextGenerator;
use crate::sources::{EvidenceSource, OpenWeatherSource, WeatherSource};
use crate::types::{EvidenceItem, WeatherSnapshot};

/// Replays a fixed script of replies, then repeats `default_reply`.
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, PipelineError>>>,
    default_reply: String,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, PipelineError>>) -> Self {
        ScriptedGenerator {
            replies: Mutex::new(replies.into()),
            default_reply: String::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator that always returns the same text.
    pub fn repeating(text: &str) -> Self {
        ScriptedGenerator {
            replies: Mutex::new(VecDeque::new()),
            default_reply: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator whose output never parses as JSON, forcing fallbacks.
    pub fn garbage() -> Self {
        Self::repeating("sorry, I cannot help with that")
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
    ) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(self.default_reply.clone()),
        }
    }
}

/// Returns the same items for every query.
pub(crate) struct StaticEvidenceSource {
    items: Vec<EvidenceItem>,
    calls: AtomicUsize,
}

impl StaticEvidenceSource {
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        StaticEvidenceSource {
            items,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceSource for StaticEvidenceSource {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.iter().take(limit).cloned().collect())
    }
}

pub(crate) struct FailingEvidenceSource;

#[async_trait]
impl EvidenceSource for FailingEvidenceSource {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<EvidenceItem>> {
        bail!("search backend unavailable")
    }
}

/// Always returns the synthetic severe reading.
pub(crate) struct FixedWeatherSource {
    calls: AtomicUsize,
}

impl FixedWeatherSource {
    pub fn new() -> Self {
        FixedWeatherSource {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for FixedWeatherSource {
    async fn current(&self, _lat: f64, _lon: f64) -> Result<WeatherSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OpenWeatherSource::synthetic_reading())
    }
}

pub(crate) struct FailingWeatherSource;

#[async_trait]
impl WeatherSource for FailingWeatherSource {
    async fn current(&self, _lat: f64, _lon: f64) -> Result<WeatherSnapshot> {
        bail!("weather provider unreachable")
    }
}

/// Minimal evidence item carrying just a URL.
pub(crate) fn evidence(url: &str) -> EvidenceItem {
    EvidenceItem {
        title: Some(format!("report at {}", url)),
        snippet: Some("service disruption reported".to_string()),
        url: Some(url.to_string()),
        date: None,
        source: Some("test".to_string()),
    }
}
