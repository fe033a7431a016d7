//! Debounced geocoding suggestions for partially typed city names.

use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{model::Suggestion, provider::WeatherGateway};

pub const SUGGESTION_QUIET_PERIOD: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 3;

/// Handle to a task scheduled on a [`Debouncer`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Prevent the task from running if its delay has not elapsed yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs at most one task per quiet period: scheduling cancels whatever is
/// still waiting.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, task: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let handle = TimerHandle { token: CancellationToken::new() };
        let token = handle.token.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });

        self.pending = Some(handle.clone());
        handle
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }
}

/// Look up suggestions once. Short input and failed lookups both yield an
/// empty list.
pub async fn suggest(gateway: &dyn WeatherGateway, partial: &str) -> Vec<Suggestion> {
    let partial = partial.trim();
    if partial.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    match gateway.fetch_suggestions(partial).await {
        Ok(suggestions) => suggestions,
        Err(e) => {
            tracing::warn!(error = %e, partial, "suggestion lookup failed");
            Vec::new()
        }
    }
}

/// Turns keystrokes into suggestion lists delivered on a channel. An empty
/// list means "hide the dropdown".
#[derive(Debug)]
pub struct SuggestionLookup {
    gateway: Arc<dyn WeatherGateway>,
    debouncer: Debouncer,
    results: mpsc::UnboundedSender<Vec<Suggestion>>,
}

impl SuggestionLookup {
    pub fn new(
        gateway: Arc<dyn WeatherGateway>,
        results: mpsc::UnboundedSender<Vec<Suggestion>>,
    ) -> Self {
        Self { gateway, debouncer: Debouncer::new(SUGGESTION_QUIET_PERIOD), results }
    }

    /// Handle the input's current text. Returns the handle of the scheduled
    /// lookup, or `None` when the text is too short to look up.
    pub fn on_input(&mut self, text: &str) -> Option<TimerHandle> {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.debouncer.cancel();
            let _ = self.results.send(Vec::new());
            return None;
        }

        let gateway = Arc::clone(&self.gateway);
        let results = self.results.clone();
        let query = query.to_string();

        Some(self.debouncer.schedule(async move {
            let suggestions = suggest(gateway.as_ref(), &query).await;
            tracing::debug!(query, count = suggestions.len(), "suggestions ready");
            let _ = results.send(suggestions);
        }))
    }

    /// Drop any pending lookup, e.g. once a suggestion has been picked.
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }
}
