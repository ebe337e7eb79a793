//! Page session runtime.
//!
//! Plays the role of the browser around the controller: loads the page,
//! starts a [`QueueingDisplay`] on it, and when the controller asks for a
//! reload, tears the session down and runs initialization again.
//!
//! # Session Loop
//!
//! 1. [`PageLoader::load`] - Fetch the page (retried after the reconnect delay)
//! 2. [`QueueingDisplay::start`] - Fallbacks, websocket, handlers
//! 3. Wait for [`ReloadSignal`] or shutdown while
//!    [`PageLoader::probe_avatars`] lets failed images fall back
//! 5. Shut the connection down; repeat from 1 on reload

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use tokio::sync::{Notify, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::controller::{Navigator, Ports, QueueingDisplay};
use crate::display::Page;
use crate::error::{Error, Result};
use crate::options::DisplayOptions;
use crate::timing::MatchClock;
use crate::transport::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// HTTP path of the queueing display page.
pub const QUEUEING_PAGE_PATH: &str = "/displays/queueing";

// ============================================================================
// ReloadSignal
// ============================================================================

/// [`Navigator`] that wakes the runtime to reload the page.
#[derive(Debug, Default)]
pub struct ReloadSignal {
    notify: Notify,
}

impl ReloadSignal {
    /// Creates a signal with no pending reload.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until a reload is requested.
    ///
    /// A request made before waiting is not lost.
    pub async fn requested(&self) {
        self.notify.notified().await;
    }
}

impl Navigator for ReloadSignal {
    fn reload(&self) {
        self.notify.notify_one();
    }
}

// ============================================================================
// PageLoader
// ============================================================================

/// Source of the display page.
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Loads a fresh page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched.
    async fn load(&self) -> Result<Page>;

    /// Loads every avatar image and reports failures to the page.
    async fn probe_avatars(&self, page: &Page);
}

// ============================================================================
// HttpPageLoader
// ============================================================================

/// [`PageLoader`] fetching the page from the event server.
#[derive(Debug, Clone)]
pub struct HttpPageLoader {
    client: Client,
    endpoint: Endpoint,
}

impl HttpPageLoader {
    /// Creates a loader for the configured server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] / [`Error::Url`] if the options are invalid
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(options: &DisplayOptions) -> Result<Self> {
        options.validate()?;
        let client = Client::builder().timeout(options.http_timeout).build()?;

        Ok(Self {
            client,
            endpoint: options.endpoint()?,
        })
    }

    /// Returns `true` if `src` loads successfully.
    async fn image_loads(&self, src: &str) -> bool {
        let url = match self.endpoint.resolve(src) {
            Ok(url) => url,
            Err(e) => {
                debug!(src, error = %e, "Unresolvable image source");
                return false;
            }
        };

        match self.client.head(url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "Image request failed");
                false
            }
        }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self) -> Result<Page> {
        let url = self.endpoint.page_url(QUEUEING_PAGE_PATH);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::page_load(url, format!("status {status}")));
        }

        let html = response.text().await?;
        debug!(%url, bytes = html.len(), "Page fetched");
        Ok(Page::from_html(&html))
    }

    async fn probe_avatars(&self, page: &Page) {
        let avatars = page.avatars();
        let results = join_all(avatars.iter().map(|avatar| self.image_loads(avatar.src()))).await;

        for (index, loaded) in results.into_iter().enumerate() {
            if !loaded {
                page.fail_avatar(index);
            }
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Runs page sessions until `shutdown` resolves.
///
/// Every session gets a fresh page, match clock and connection, so nothing
/// survives a reload. Rendered status lines are published to `renders`.
///
/// # Errors
///
/// Returns an error if the options are invalid or the transport cannot be
/// started. Recoverable page load failures are retried; any other loader
/// error is returned.
pub async fn run<L, F>(
    options: &DisplayOptions,
    loader: &L,
    renders: watch::Sender<String>,
    shutdown: F,
) -> Result<()>
where
    L: PageLoader + ?Sized,
    F: Future<Output = ()>,
{
    let transport = options.transport()?;
    tokio::pin!(shutdown);

    loop {
        let page = tokio::select! {
            result = loader.load() => result,
            () = &mut shutdown => return Ok(()),
        };

        let page = match page {
            Ok(page) => Arc::new(page),
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                warn!(
                    error = %e,
                    delay_ms = options.reconnect_delay.as_millis() as u64,
                    "Page load failed, retrying"
                );
                tokio::select! {
                    () = sleep(options.reconnect_delay) => {}
                    () = &mut shutdown => return Ok(()),
                }
                continue;
            }
        };
        page.attach_renderer(renders.clone());

        let reload = Arc::new(ReloadSignal::new());
        let ports = Ports {
            display: page.clone(),
            navigator: reload.clone(),
            translator: Arc::new(MatchClock::new()),
        };
        let controller = QueueingDisplay::start(&transport, ports)?;
        let session_id = controller.session().session_id();
        info!(%session_id, avatars = page.avatars().len(), "Page session started");

        let probe = loader.probe_avatars(&page);
        tokio::pin!(probe);
        let mut probing = true;

        let reloading = loop {
            tokio::select! {
                () = &mut probe, if probing => probing = false,
                () = reload.requested() => break true,
                () = &mut shutdown => break false,
            }
        };

        controller.session().shutdown();
        if !reloading {
            info!(%session_id, "Display stopped");
            return Ok(());
        }
        info!(%session_id, "Reloading page");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use crate::display::{AVATAR_PLACEHOLDER, Display};

    const MATCH_LOAD: &str = r#"{"type":"matchLoad","data":{}}"#;

    struct StaticLoader {
        html: &'static str,
        broken: &'static [&'static str],
        loads: AtomicUsize,
        failures_left: AtomicUsize,
        fatal: bool,
        stall_probe: bool,
    }

    impl StaticLoader {
        fn new(html: &'static str) -> Self {
            Self {
                html,
                broken: &[],
                loads: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
                fatal: false,
                stall_probe: false,
            }
        }
    }

    #[async_trait]
    impl PageLoader for StaticLoader {
        async fn load(&self) -> Result<Page> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                if self.fatal {
                    return Err(Error::config("bad page template"));
                }
                return Err(Error::page_load("test://page", "status 503"));
            }
            Ok(Page::from_html(self.html))
        }

        async fn probe_avatars(&self, page: &Page) {
            if self.stall_probe {
                std::future::pending::<()>().await;
            }
            for (index, avatar) in page.avatars().iter().enumerate() {
                if self.broken.iter().any(|broken| *broken == avatar.src()) {
                    page.fail_avatar(index);
                }
            }
        }
    }

    fn options() -> DisplayOptions {
        // Nothing listens on port 1; the websocket just keeps retrying.
        DisplayOptions::new()
            .with_server("http://127.0.0.1:1")
            .with_reconnect_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_reload_signal_keeps_early_request() {
        let signal = ReloadSignal::new();
        signal.reload();
        tokio_test::block_on(async {
            timeout(Duration::from_secs(1), signal.requested())
                .await
                .expect("request kept");
        });
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let loader = StaticLoader::new(r#"<img class="avatar" src="/a.png">"#);
        let (tx, _rx) = watch::channel(String::new());

        let result = timeout(
            Duration::from_secs(5),
            run(&options(), &loader, tx, sleep(Duration::from_millis(50))),
        )
        .await
        .expect("stops");

        assert!(result.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_retries_failed_page_load() {
        let loader = StaticLoader::new("<html></html>");
        loader.failures_left.store(2, Ordering::SeqCst);
        let (tx, mut rx) = watch::channel(String::from("unset"));

        let handle = async {
            rx.changed().await.expect("render published");
            assert_eq!(*rx.borrow(), "- -");
        };

        let options = options();
        let runner = run(&options, &loader, tx, sleep(Duration::from_millis(200)));
        let (result, ()) = tokio::join!(runner, handle);

        assert!(result.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_unrecoverable_page_error() {
        let mut loader = StaticLoader::new("<html></html>");
        loader.fatal = true;
        loader.failures_left.store(1, Ordering::SeqCst);
        let (tx, _rx) = watch::channel(String::new());

        let result = timeout(
            Duration::from_secs(5),
            run(&options(), &loader, tx, std::future::pending()),
        )
        .await
        .expect("returns");

        assert!(matches!(result, Err(Error::Config { .. })));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_not_blocked_by_avatar_probe() {
        let mut loader = StaticLoader::new(r#"<img class="avatar" src="/a.png">"#);
        loader.stall_probe = true;
        let (tx, _rx) = watch::channel(String::new());

        let result = timeout(
            Duration::from_secs(2),
            run(&options(), &loader, tx, sleep(Duration::from_millis(50))),
        )
        .await
        .expect("stops while probing");

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_second_match_load_starts_new_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut first = accept_async(stream).await.expect("handshake");
            for _ in 0..2 {
                first.send(WsMessage::text(MATCH_LOAD.to_string())).await.expect("send");
            }

            // The reload must tear the first connection down.
            let mut first_closed = false;
            while let Ok(frame) = timeout(Duration::from_secs(5), first.next()).await {
                match frame {
                    Some(Ok(frame)) if !frame.is_close() => {}
                    _ => {
                        first_closed = true;
                        break;
                    }
                }
            }

            let (stream, _) = listener.accept().await.expect("accept");
            let mut second = accept_async(stream).await.expect("handshake");
            second.send(WsMessage::text(MATCH_LOAD.to_string())).await.expect("send");

            sleep(Duration::from_millis(200)).await;
            let _ = stop_tx.send(());
            first_closed
        });

        let mut loader = StaticLoader::new(r#"<img class="avatar" src="/a.png">"#);
        loader.stall_probe = true;
        let options = DisplayOptions::new()
            .with_server(format!("http://127.0.0.1:{port}"))
            .with_reconnect_delay(Duration::from_millis(50));
        let (tx, _rx) = watch::channel(String::new());

        let result = timeout(
            Duration::from_secs(10),
            run(&options, &loader, tx, async {
                let _ = stop_rx.await;
            }),
        )
        .await
        .expect("stops");

        assert!(result.is_ok());
        assert!(server.await.expect("server task"), "first connection closed");
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_options_fail_fast() {
        let loader = StaticLoader::new("");
        let (tx, _rx) = watch::channel(String::new());
        let options = DisplayOptions::new().with_server("ftp://nowhere");

        let result = run(&options, &loader, tx, std::future::pending()).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_broken_avatar_falls_back_during_session() {
        let mut loader = StaticLoader::new(
            r#"<img class="avatar" src="/static/img/avatars/9999.png"><img class="avatar" src="/static/img/avatars/254.png">"#,
        );
        loader.broken = &["/static/img/avatars/9999.png"];

        let page = loader.load().await.expect("page");
        page.install_avatar_fallback(AVATAR_PLACEHOLDER);
        loader.probe_avatars(&page).await;

        let sources: Vec<_> = page.avatars().iter().map(|a| a.src().to_string()).collect();
        assert_eq!(sources, [AVATAR_PLACEHOLDER, "/static/img/avatars/254.png"]);
    }

    #[test]
    fn test_http_loader_rejects_bad_options() {
        let options = DisplayOptions::new().with_server("not a url");
        assert!(HttpPageLoader::new(&options).is_err());
    }
}
