//! Chromium engine backed by chromiumoxide
//!
//! Every launch gets its own throwaway profile directory, so concurrent
//! renders never share cookies, storage or history.

use crate::client::FetchOptions;
use crate::error::RenderError;
use crate::render::{BrowserSession, RenderEngine, RenderPage};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long a closing browser may take to exit before it is killed
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Launches headless Chromium instances on demand
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
    headless: bool,
    args: Vec<String>,
    request_timeout: Duration,
    launches: AtomicU64,
    live: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl ChromiumEngine {
    /// Resolve the browser configuration once
    ///
    /// Fails when no Chrome/Chromium executable can be found, which the
    /// service treats as "engine unavailable".
    pub fn start(options: &FetchOptions) -> Result<Self, RenderError> {
        let engine = Self {
            executable: options.chrome_executable.clone(),
            headless: options.headless,
            args: options.browser_args.clone(),
            request_timeout: options.timeout,
            launches: AtomicU64::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        };

        engine.config(&std::env::temp_dir())?;
        info!(
            executable = ?engine.executable,
            headless = engine.headless,
            "Browser engine initialized"
        );
        Ok(engine)
    }

    /// Number of browser instances currently running
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn config(&self, profile: &Path) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile)
            .request_timeout(self.request_timeout)
            .args(self.args.iter().map(String::as_str));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        builder.build().map_err(RenderError::Launch)
    }

    fn next_profile_dir(&self) -> PathBuf {
        let seq = self.launches.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("mdfetch-profile-{}-{seq}", std::process::id()))
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Launch("engine has been shut down".to_string()));
        }

        let profile = self.next_profile_dir();
        let config = self.config(&profile)?;
        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(err) => {
                discard_profile(&profile).await;
                return Err(RenderError::Launch(err.to_string()));
            }
        };

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(profile = %profile.display(), live, "Launched browser");

        Ok(Box::new(ChromiumSession {
            browser,
            handler,
            profile,
            live: self.live.clone(),
        }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let live = self.live_instances();
        if live > 0 {
            warn!(live, "Browser engine shut down with instances still running");
        }
        info!("Browser engine shut down");
        Ok(())
    }
}

struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: PathBuf,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn RenderPage>, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let mut this = self;
        let closed = this
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Close(e.to_string()));

        let exited = match &closed {
            Ok(()) => within(EXIT_GRACE, this.browser.wait()).await,
            Err(_) => None,
        };
        match exited {
            Some(Ok(_)) => {}
            Some(Err(err)) => debug!(error = %err, "Error waiting for browser process"),
            None => {
                warn!(profile = %this.profile.display(), "Browser did not exit, killing it");
                if let Some(Err(err)) = this.browser.kill().await {
                    warn!(error = %err, "Error killing browser process");
                }
            }
        }

        discard_profile(&this.profile).await;
        closed
    }
}

// Runs on close and on cancellation alike.
impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromiumPage {
    // Completes on DOMContentLoaded, not on the `load` event `Page::goto` awaits.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let navigation_error = |message: String| RenderError::Navigation {
            url: url.to_string(),
            message,
        };

        let loaded = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        if let Some(error_text) = response.result.error_text {
            return Err(navigation_error(error_text));
        }

        first_event(loaded, url).await
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.page
            .close()
            .await
            .map_err(|e| RenderError::Close(e.to_string()))
    }
}

/// Wait for the first event of `events`
///
/// A stream that ends first means the page went away mid-navigation.
async fn first_event<S>(mut events: S, url: &str) -> Result<(), RenderError>
where
    S: Stream + Unpin,
{
    match events.next().await {
        Some(_) => Ok(()),
        None => Err(RenderError::Navigation {
            url: url.to_string(),
            message: "page closed before DOMContentLoaded".to_string(),
        }),
    }
}

/// Run `work` for at most `grace`; `None` when it did not finish
async fn within<F: Future>(grace: Duration, work: F) -> Option<F::Output> {
    tokio::time::timeout(grace, work).await.ok()
}

async fn discard_profile(profile: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(profile).await {
        debug!(profile = %profile.display(), error = %err, "Profile directory not removed");
    }
}
