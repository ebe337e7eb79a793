//! Queueing display controller.
//!
//! Binds the three server pushes the queueing display reacts to onto the
//! display surface:
//!
//! | Message | Effect |
//! |---------|--------|
//! | `matchLoad` | First one ignored; every later one reloads the page |
//! | `matchTime` | Updates the `matchState` and `matchTime` regions |
//! | `matchTiming` | Forwarded to the time translator |
//!
//! The server sends a `matchLoad` as soon as the websocket connects, so
//! the first one only confirms the connection and must not reload.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::display::{AVATAR_PLACEHOLDER, Display, TextRegion, format_countdown};
use crate::error::Result;
use crate::protocol::{Message, event_names};
use crate::timing::TimeTranslator;
use crate::transport::{HandlerMap, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Websocket path of the queueing display.
pub const QUEUEING_WEBSOCKET_PATH: &str = "/displays/queueing/websocket";

// ============================================================================
// Navigator
// ============================================================================

/// Page navigation port.
pub trait Navigator: Send + Sync {
    /// Discards the current page session and loads it again from scratch.
    fn reload(&self);
}

// ============================================================================
// LoadState
// ============================================================================

/// Whether the connection-confirming `matchLoad` has been seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No `matchLoad` received yet in this page session.
    #[default]
    AwaitingFirstLoad,
    /// Confirmation seen; further `matchLoad`s reload the page.
    Steady,
}

// ============================================================================
// Ports
// ============================================================================

/// Collaborators the controller drives.
#[derive(Clone)]
pub struct Ports {
    /// Text regions and avatars.
    pub display: Arc<dyn Display>,
    /// Page reload.
    pub navigator: Arc<dyn Navigator>,
    /// Match time translation and timing cache.
    pub translator: Arc<dyn TimeTranslator>,
}

impl fmt::Debug for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}

// ============================================================================
// QueueingDisplay
// ============================================================================

/// Controller for one page session.
///
/// Generic over the transport session handle it keeps alive.
pub struct QueueingDisplay<S> {
    /// State shared with the registered handlers.
    state: Arc<ControllerState>,
    /// Transport session for this page session.
    session: S,
}

impl<S> QueueingDisplay<S> {
    /// Initializes the page session.
    ///
    /// Installs the avatar fallback, then opens exactly one transport
    /// session against [`QUEUEING_WEBSOCKET_PATH`] with the `matchLoad`,
    /// `matchTime` and `matchTiming` handlers.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the session cannot be opened.
    pub fn start<T>(transport: &T, ports: Ports) -> Result<Self>
    where
        T: Transport<Session = S>,
    {
        ports.display.install_avatar_fallback(AVATAR_PLACEHOLDER);

        let state = Arc::new(ControllerState {
            load_state: Mutex::new(LoadState::AwaitingFirstLoad),
            ports,
        });

        let handlers = HandlerMap::new()
            .on(event_names::MATCH_LOAD, {
                let state = Arc::clone(&state);
                move |message: &Message| state.handle_match_load(&message.data)
            })
            .on(event_names::MATCH_TIME, {
                let state = Arc::clone(&state);
                move |message: &Message| state.handle_match_time(&message.data)
            })
            .on(event_names::MATCH_TIMING, {
                let state = Arc::clone(&state);
                move |message: &Message| state.handle_match_timing(&message.data)
            });

        let session = transport.open(QUEUEING_WEBSOCKET_PATH, handlers)?;
        debug!("Queueing display started");

        Ok(Self { state, session })
    }

    /// Returns the transport session handle.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns the current load state.
    #[inline]
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        *self.state.load_state.lock()
    }
}

impl<S> fmt::Debug for QueueingDisplay<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueingDisplay")
            .field("load_state", &self.load_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ControllerState
// ============================================================================

struct ControllerState {
    load_state: Mutex<LoadState>,
    ports: Ports,
}

impl ControllerState {
    fn handle_match_load(&self, _data: &Value) -> Result<()> {
        let previous = std::mem::replace(&mut *self.load_state.lock(), LoadState::Steady);

        match previous {
            LoadState::AwaitingFirstLoad => {
                debug!("Ignoring connection-confirming matchLoad");
            }
            LoadState::Steady => {
                info!("Match loaded, reloading page");
                self.ports.navigator.reload();
            }
        }
        Ok(())
    }

    fn handle_match_time(&self, data: &Value) -> Result<()> {
        let display = &self.ports.display;
        self.ports
            .translator
            .translate_match_time(data, &mut |_state, state_text, countdown_sec| {
                display.set_text(TextRegion::MatchState, state_text);
                display.set_text(TextRegion::MatchTime, &format_countdown(countdown_sec));
            })
    }

    fn handle_match_timing(&self, data: &Value) -> Result<()> {
        self.ports.translator.handle_match_timing(data)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::display::Page;
    use crate::error::Error;
    use crate::timing::{MatchClock, MatchState};

    // ------------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct RecordingTransport {
        opened: Mutex<Vec<(String, Vec<String>)>>,
        handlers: Mutex<Option<HandlerMap>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn fire(&self, message_type: &str, data: Value) {
            let handlers = self.handlers.lock();
            let handlers = handlers.as_ref().expect("session opened");
            handlers.dispatch(&Message::new(message_type, data));
        }
    }

    impl Transport for RecordingTransport {
        type Session = ();

        fn open(&self, path: &str, handlers: HandlerMap) -> Result<()> {
            if self.fail {
                return Err(Error::connection("refused"));
            }
            let names = handlers.names().into_iter().map(str::to_string).collect();
            self.opened.lock().push((path.to_string(), names));
            *self.handlers.lock() = Some(handlers);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingNavigator {
        reloads: AtomicUsize,
    }

    impl Navigator for CountingNavigator {
        fn reload(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FixedTranslator {
        timing_payloads: Mutex<Vec<Value>>,
    }

    impl TimeTranslator for FixedTranslator {
        fn translate_match_time(
            &self,
            data: &Value,
            callback: &mut dyn FnMut(MatchState, &str, u32),
        ) -> Result<()> {
            let countdown = data["countdown"].as_u64().unwrap_or_default() as u32;
            callback(MatchState::TeleopPeriod, "TELEOPERATED", countdown);
            Ok(())
        }

        fn handle_match_timing(&self, data: &Value) -> Result<()> {
            self.timing_payloads.lock().push(data.clone());
            Ok(())
        }
    }

    struct Harness {
        transport: RecordingTransport,
        page: Arc<Page>,
        navigator: Arc<CountingNavigator>,
        translator: Arc<FixedTranslator>,
        controller: QueueingDisplay<()>,
    }

    fn harness(page: Page) -> Harness {
        let transport = RecordingTransport::default();
        let page = Arc::new(page);
        let navigator = Arc::new(CountingNavigator::default());
        let translator = Arc::new(FixedTranslator::default());
        let ports = Ports {
            display: page.clone(),
            navigator: navigator.clone(),
            translator: translator.clone(),
        };
        let controller = QueueingDisplay::start(&transport, ports).expect("start");

        Harness {
            transport,
            page,
            navigator,
            translator,
            controller,
        }
    }

    fn reloads(h: &Harness) -> usize {
        h.navigator.reloads.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_start_opens_one_session_with_three_handlers() {
        let h = harness(Page::new());
        let opened = h.transport.opened.lock();

        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "/displays/queueing/websocket");
        assert_eq!(opened[0].1, ["matchLoad", "matchTime", "matchTiming"]);
    }

    #[test]
    fn test_start_propagates_transport_error() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let ports = Ports {
            display: Arc::new(Page::new()),
            navigator: Arc::new(CountingNavigator::default()),
            translator: Arc::new(MatchClock::new()),
        };

        let result = QueueingDisplay::start(&transport, ports);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[test]
    fn test_first_match_load_is_ignored() {
        let h = harness(Page::new());
        assert_eq!(h.controller.load_state(), LoadState::AwaitingFirstLoad);

        h.transport.fire("matchLoad", json!({"Match": {"Id": 1}}));

        assert_eq!(reloads(&h), 0);
        assert_eq!(h.controller.load_state(), LoadState::Steady);
    }

    #[test]
    fn test_each_later_match_load_reloads_once() {
        let h = harness(Page::new());

        for expected in 0..4 {
            h.transport.fire("matchLoad", Value::Null);
            assert_eq!(reloads(&h), expected);
        }
        assert_eq!(h.controller.load_state(), LoadState::Steady);
    }

    #[test]
    fn test_match_time_updates_regions() {
        let h = harness(Page::new());
        h.transport.fire("matchTime", json!({"countdown": 125}));

        assert_eq!(
            h.page.text(TextRegion::MatchState).as_deref(),
            Some("TELEOPERATED")
        );
        assert_eq!(h.page.text(TextRegion::MatchTime).as_deref(), Some("2:05"));
    }

    #[test]
    fn test_match_time_before_first_load_is_processed() {
        let h = harness(Page::new());
        h.transport.fire("matchTime", json!({"countdown": 59}));

        assert_eq!(h.page.text(TextRegion::MatchTime).as_deref(), Some("0:59"));
        assert_eq!(h.controller.load_state(), LoadState::AwaitingFirstLoad);
    }

    #[test]
    fn test_match_timing_is_forwarded_unchanged() {
        let h = harness(Page::new());
        let payload = json!({"AutoDurationSec": 15, "Extra": [1, 2, 3]});

        h.transport.fire("matchTiming", payload.clone());

        assert_eq!(h.translator.timing_payloads.lock().as_slice(), [payload]);
        assert_eq!(h.controller.load_state(), LoadState::AwaitingFirstLoad);
        assert_eq!(h.page.text(TextRegion::MatchState), None);
        assert_eq!(h.page.text(TextRegion::MatchTime), None);
        assert_eq!(reloads(&h), 0);
    }

    #[test]
    fn test_avatar_fallback_installed_on_start() {
        let h = harness(Page::with_avatars(["/static/img/avatars/9999.png"]));

        assert!(h.page.fail_avatar(0));
        assert!(!h.page.fail_avatar(0));
        assert_eq!(h.page.avatars()[0].src(), "/static/img/avatars/0.png");
    }

    #[test]
    fn test_with_match_clock() {
        let transport = RecordingTransport::default();
        let page = Arc::new(Page::new());
        let ports = Ports {
            display: page.clone(),
            navigator: Arc::new(CountingNavigator::default()),
            translator: Arc::new(MatchClock::new()),
        };
        let _controller = QueueingDisplay::start(&transport, ports).expect("start");

        // Without timing the translation fails and the regions stay empty.
        transport.fire("matchTime", json!({"MatchState": 3, "MatchTimeSec": 5}));
        assert_eq!(page.text(TextRegion::MatchTime), None);

        transport.fire(
            "matchTiming",
            json!({"WarmupDurationSec": 0, "AutoDurationSec": 15, "PauseDurationSec": 2, "TeleopDurationSec": 135}),
        );
        transport.fire("matchTime", json!({"MatchState": 5, "MatchTimeSec": 30}));

        assert_eq!(
            page.text(TextRegion::MatchState).as_deref(),
            Some("TELEOPERATED")
        );
        assert_eq!(page.text(TextRegion::MatchTime).as_deref(), Some("2:02"));
    }
}
