//! Content service: the four public operations
//!
//! The service composes the fetchers and the conversion pipeline. It owns
//! the browser engine handle, which is resolved once in
//! [`ServiceBuilder::build`] and only read afterwards, so requests share it
//! without locking.

use crate::client::FetchOptions;
use crate::convert::convert_html;
use crate::error::{FetchError, RenderError};
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::render::{self, ChromiumEngine, RenderEngine, RenderOutcome};
use crate::target::FetchTarget;
use crate::types::ConversionMode;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type EngineInit =
    Box<dyn FnOnce(&FetchOptions) -> Result<Arc<dyn RenderEngine>, RenderError> + Send>;

/// Builder for [`ContentService`]
pub struct ServiceBuilder {
    options: FetchOptions,
    fetcher: Option<Arc<dyn Fetcher>>,
    engine_init: Option<EngineInit>,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// Create a builder with default options and the Chromium engine
    pub fn new() -> Self {
        Self {
            options: FetchOptions::default(),
            fetcher: None,
            engine_init: None,
        }
    }

    /// Replace all fetch options at once
    pub fn options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Set the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Use a specific Chrome/Chromium binary
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.chrome_executable = Some(path.into());
        self
    }

    /// Show the browser window
    pub fn headless(mut self, headless: bool) -> Self {
        self.options.headless = headless;
        self
    }

    /// Add a browser command line argument
    pub fn browser_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.browser_args.push(arg.into());
        self
    }

    /// Use a custom raw fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use an already constructed engine
    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.engine_init = Some(Box::new(move |_| Ok(engine)));
        self
    }

    /// Use a custom engine initializer
    ///
    /// The initializer runs once in [`build`](Self::build). An error leaves
    /// the service without an engine rather than failing the build.
    pub fn engine_init<F>(mut self, init: F) -> Self
    where
        F: FnOnce(&FetchOptions) -> Result<Arc<dyn RenderEngine>, RenderError> + Send + 'static,
    {
        self.engine_init = Some(Box::new(init));
        self
    }

    /// Build the service, initializing the browser engine best-effort
    pub fn build(self) -> ContentService {
        let init = self.engine_init.unwrap_or_else(|| {
            Box::new(|options: &FetchOptions| {
                ChromiumEngine::start(options).map(|engine| Arc::new(engine) as Arc<dyn RenderEngine>)
            })
        });

        let engine = match init(&self.options) {
            Ok(engine) => {
                info!(engine = engine.name(), "Rendering enabled");
                Some(engine)
            }
            Err(err) => {
                warn!(error = %err, "Could not initialize browser engine. Browser-based operations will fail.");
                None
            }
        };

        ContentService {
            options: self.options,
            fetcher: self.fetcher.unwrap_or_else(|| Arc::new(HttpFetcher::new())),
            engine,
        }
    }
}

/// Fetches raw, rendered and Markdown content
pub struct ContentService {
    options: FetchOptions,
    fetcher: Arc<dyn Fetcher>,
    engine: Option<Arc<dyn RenderEngine>>,
}

impl ContentService {
    /// Create a new service builder
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// Service with default options and best-effort Chromium startup
    pub fn new() -> Self {
        ServiceBuilder::new().build()
    }

    /// Options the service was built with
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// True when a browser engine was initialized
    pub fn rendering_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Fetch the body directly over HTTP, without rendering
    pub async fn raw_text(&self, url: &str) -> Result<String, FetchError> {
        let target = FetchTarget::parse(url)?;
        debug!(fetcher = self.fetcher.name(), url = %target, "Fetching raw text");
        self.fetcher.fetch(&target, &self.options).await
    }

    /// Render the page and report exactly what happened
    ///
    /// Fails only for an invalid URL or a missing engine. Navigation
    /// problems come back as [`RenderOutcome::Failed`].
    pub async fn render(&self, url: &str) -> Result<RenderOutcome, FetchError> {
        let target = FetchTarget::parse(url)?;
        let engine = self.engine.as_deref().ok_or(FetchError::EngineUnavailable)?;
        Ok(render::render(engine, &target, self.options.timeout).await)
    }

    /// Fully rendered HTML, or an empty string when rendering failed
    pub async fn rendered_html(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.render(url).await?.into_html())
    }

    /// Whole rendered page as Markdown
    pub async fn markdown(&self, url: &str) -> Result<String, FetchError> {
        let html = self.rendered_html(url).await?;
        Ok(convert_html(&html, ConversionMode::Full).into_string())
    }

    /// Main content region of the rendered page as Markdown
    pub async fn markdown_summary(&self, url: &str) -> Result<String, FetchError> {
        let html = self.rendered_html(url).await?;
        Ok(convert_html(&html, ConversionMode::MainContentOnly).into_string())
    }

    /// Tear down the browser engine
    pub async fn shutdown(self) {
        if let Some(engine) = self.engine {
            if let Err(err) = engine.shutdown().await {
                warn!(engine = engine.name(), error = %err, "Error closing browser engine");
            }
        }
    }
}

impl Default for ContentService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_engine() -> ContentService {
        ContentService::builder()
            .engine_init(|_| Err(RenderError::Launch("no browser in tests".into())))
            .build()
    }

    #[test]
    fn test_builder_options() {
        let service = ContentService::builder()
            .user_agent("TestAgent/1.0")
            .timeout(Duration::from_secs(5))
            .chrome_executable("/usr/bin/chromium")
            .headless(false)
            .browser_arg("--no-sandbox")
            .engine_init(|_| Err(RenderError::Launch("skip".into())))
            .build();

        let options = service.options();
        assert_eq!(options.user_agent.as_deref(), Some("TestAgent/1.0"));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(
            options.chrome_executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert!(!options.headless);
        assert_eq!(options.browser_args, vec!["--no-sandbox"]);
    }

    #[test]
    fn test_engine_init_receives_options() {
        let service = ContentService::builder()
            .timeout(Duration::from_secs(3))
            .engine_init(|options| {
                assert_eq!(options.timeout, Duration::from_secs(3));
                Err(RenderError::Launch("checked".into()))
            })
            .build();
        assert!(!service.rendering_available());
    }

    #[tokio::test]
    async fn test_missing_engine_fails_rendering_operations() {
        let service = without_engine();
        assert!(!service.rendering_available());

        for result in [
            service.rendered_html("https://example.com").await,
            service.markdown("https://example.com").await,
            service.markdown_summary("https://example.com").await,
        ] {
            assert!(matches!(result, Err(FetchError::EngineUnavailable)));
        }
    }

    #[tokio::test]
    async fn test_validation_precedes_engine_check() {
        let service = without_engine();
        assert!(matches!(
            service.markdown("ftp://example.com").await,
            Err(FetchError::InvalidUrlScheme)
        ));
        assert!(matches!(
            service.raw_text("").await,
            Err(FetchError::MissingUrl)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_without_engine() {
        without_engine().shutdown().await;
    }
}
