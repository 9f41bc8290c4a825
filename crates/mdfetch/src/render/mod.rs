//! Browser rendering
//!
//! Design: a long-lived [`RenderEngine`] launches one isolated
//! [`BrowserSession`] per request, and each session opens one
//! [`RenderPage`]. [`with_page`] owns both for the duration of a closure
//! and closes them on every exit path, so no page or browser instance
//! outlives the call that created it.

mod chromium;

pub use chromium::ChromiumEngine;

use crate::error::RenderError;
use crate::target::FetchTarget;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, warn};

/// Process-wide browser engine handle
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Start a fresh, isolated browser instance
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;

    /// Tear the engine down; called once at service shutdown
    async fn shutdown(&self) -> Result<(), RenderError>;
}

/// One browser instance, owned by a single render call
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a blank page in this instance
    async fn new_page(&mut self) -> Result<Box<dyn RenderPage>, RenderError>;

    /// Close the instance and release its process
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// One page inside a [`BrowserSession`]
#[async_trait]
pub trait RenderPage: Send {
    /// Navigate and wait until the DOM content is loaded
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Serialize the current DOM as HTML
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Close the page
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// Outcome of a single render attempt
///
/// `Empty` and `Failed` both become an empty string at the service
/// boundary; keeping them apart lets callers and tests tell a blank page
/// from a failed render.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Serialized page HTML
    Rendered(String),
    /// The page rendered but produced no markup
    Empty,
    /// Launch, navigation or serialization failed
    Failed(RenderError),
}

impl RenderOutcome {
    /// True for a failed render
    pub fn is_failed(&self) -> bool {
        matches!(self, RenderOutcome::Failed(_))
    }

    /// Page HTML, or an empty string for empty and failed renders
    pub fn into_html(self) -> String {
        match self {
            RenderOutcome::Rendered(html) => html,
            RenderOutcome::Empty | RenderOutcome::Failed(_) => String::new(),
        }
    }
}

/// Run `work` against a freshly launched browser page
///
/// The page and its browser instance are closed afterwards whether `work`
/// succeeded, failed or timed out. Close failures are logged and never
/// replace the result of `work`.
pub async fn with_page<T, F>(engine: &dyn RenderEngine, work: F) -> Result<T, RenderError>
where
    F: for<'p> FnOnce(&'p mut dyn RenderPage) -> BoxFuture<'p, Result<T, RenderError>>,
{
    let mut session = engine.launch().await?;

    let result = match session.new_page().await {
        Ok(mut page) => {
            let result = work(page.as_mut()).await;
            if let Err(err) = page.close().await {
                warn!(engine = engine.name(), error = %err, "Error closing page");
            }
            result
        }
        Err(err) => Err(err),
    };

    if let Err(err) = session.close().await {
        warn!(engine = engine.name(), error = %err, "Error closing browser");
    }

    result
}

/// Render `target` and capture its HTML, never failing outright
///
/// Navigation plus serialization is bounded by `timeout`; cleanup still
/// runs once the deadline passes.
pub async fn render(
    engine: &dyn RenderEngine,
    target: &FetchTarget,
    timeout: Duration,
) -> RenderOutcome {
    let url = target.as_str().to_owned();
    debug!(engine = engine.name(), url = %url, "Rendering page");

    let result = with_page(engine, move |page| {
        Box::pin(async move {
            let load = async {
                page.navigate(&url).await?;
                page.content().await
            };
            match tokio::time::timeout(timeout, load).await {
                Ok(result) => result,
                Err(_) => Err(RenderError::Timeout {
                    url: url.clone(),
                    seconds: timeout.as_secs(),
                }),
            }
        })
    })
    .await;

    match result {
        Ok(html) if html.trim().is_empty() => RenderOutcome::Empty,
        Ok(html) => RenderOutcome::Rendered(html),
        Err(err) => {
            warn!(url = %target, error = %err, "Failed to fetch rendered HTML");
            RenderOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        pages_closed: AtomicUsize,
        sessions_closed: AtomicUsize,
    }

    struct StubEngine {
        counters: Arc<Counters>,
        fail_page: bool,
        fail_close: bool,
    }

    struct StubSession {
        counters: Arc<Counters>,
        fail_page: bool,
        fail_close: bool,
    }

    struct StubPage {
        counters: Arc<Counters>,
        fail_close: bool,
    }

    #[async_trait]
    impl RenderEngine for StubEngine {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession {
                counters: self.counters.clone(),
                fail_page: self.fail_page,
                fail_close: self.fail_close,
            }))
        }

        async fn shutdown(&self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserSession for StubSession {
        async fn new_page(&mut self) -> Result<Box<dyn RenderPage>, RenderError> {
            if self.fail_page {
                return Err(RenderError::Page("crashed".into()));
            }
            Ok(Box::new(StubPage {
                counters: self.counters.clone(),
                fail_close: self.fail_close,
            }))
        }

        async fn close(self: Box<Self>) -> Result<(), RenderError> {
            self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(RenderError::Close("browser".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RenderPage for StubPage {
        async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
            if url.contains("unreachable") {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_NAME_NOT_RESOLVED".into(),
                });
            }
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String, RenderError> {
            Ok("<html><body><p>stub</p></body></html>".to_string())
        }

        async fn close(self: Box<Self>) -> Result<(), RenderError> {
            self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(RenderError::Close("page".into()));
            }
            Ok(())
        }
    }

    fn engine(fail_page: bool, fail_close: bool) -> (StubEngine, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let engine = StubEngine {
            counters: counters.clone(),
            fail_page,
            fail_close,
        };
        (engine, counters)
    }

    fn target(url: &str) -> FetchTarget {
        FetchTarget::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_render_success_closes_everything() {
        let (engine, counters) = engine(false, false);
        let outcome = render(&engine, &target("https://example.com"), Duration::from_secs(1)).await;

        assert!(matches!(outcome, RenderOutcome::Rendered(ref html) if html.contains("stub")));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_failed_outcome() {
        let (engine, counters) = engine(false, false);
        let outcome = render(
            &engine,
            &target("https://unreachable.invalid"),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(
            outcome,
            RenderOutcome::Failed(RenderError::Navigation { .. })
        ));
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_still_cleans_up() {
        let (engine, counters) = engine(false, false);
        let outcome = render(
            &engine,
            &target("https://slow.example.com"),
            Duration::from_millis(20),
        )
        .await;

        assert!(matches!(
            outcome,
            RenderOutcome::Failed(RenderError::Timeout { .. })
        ));
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.into_html(), "");
    }

    #[tokio::test]
    async fn test_page_open_failure_still_closes_browser() {
        let (engine, counters) = engine(true, false);
        let outcome = render(&engine, &target("https://example.com"), Duration::from_secs(1)).await;

        assert!(matches!(outcome, RenderOutcome::Failed(RenderError::Page(_))));
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 0);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_failures_do_not_mask_result() {
        let (engine, counters) = engine(false, true);
        let outcome = render(&engine, &target("https://example.com"), Duration::from_secs(1)).await;

        assert!(matches!(outcome, RenderOutcome::Rendered(_)));
        assert_eq!(counters.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outcome_into_html() {
        assert_eq!(RenderOutcome::Rendered("<p>x</p>".into()).into_html(), "<p>x</p>");
        assert_eq!(RenderOutcome::Empty.into_html(), "");
        let failed = RenderOutcome::Failed(RenderError::Launch("no chrome".into()));
        assert!(failed.is_failed());
        assert_eq!(failed.into_html(), "");
    }
}
