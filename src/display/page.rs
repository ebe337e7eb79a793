//! In-process page model.
//!
//! Holds what the queueing display currently shows: the text of each
//! region and the avatar images found in the served page.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tracing::debug;

use super::{AVATAR_CLASS, Avatar, Display, TextRegion};

// ============================================================================
// Constants
// ============================================================================

/// Matches a whole `<img ...>` tag.
static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img regex"));

/// Captures the value of a `class` attribute.
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid class regex")
});

/// Captures the value of a `src` attribute.
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid src regex")
});

// ============================================================================
// Page
// ============================================================================

/// The displayed page.
///
/// Shared between the controller's handlers and the runtime, so all
/// mutation goes through interior locks.
#[derive(Debug, Default)]
pub struct Page {
    /// Current text per region.
    regions: RwLock<FxHashMap<TextRegion, String>>,
    /// Avatar images in document order.
    avatars: Mutex<Vec<Avatar>>,
    /// Receives the rendered status line after every text change.
    renderer: Mutex<Option<watch::Sender<String>>>,
}

impl Page {
    /// Creates an empty page.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a page with the given avatar sources.
    #[must_use]
    pub fn with_avatars(sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let avatars = sources.into_iter().map(Avatar::new).collect();
        Self {
            avatars: Mutex::new(avatars),
            ..Self::default()
        }
    }

    /// Builds a page from served HTML, collecting every `img.avatar`.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        let sources: Vec<String> = IMG_TAG
            .find_iter(html)
            .filter_map(|tag| avatar_source(tag.as_str()))
            .collect();

        debug!(avatars = sources.len(), "Parsed page");
        Self::with_avatars(sources)
    }

    /// Returns the current text of a region.
    #[must_use]
    pub fn text(&self, region: TextRegion) -> Option<String> {
        self.regions.read().get(&region).cloned()
    }

    /// Returns a snapshot of the avatars.
    #[must_use]
    pub fn avatars(&self) -> Vec<Avatar> {
        self.avatars.lock().clone()
    }

    /// Reports that the avatar at `index` failed to load.
    ///
    /// Returns `true` if its source was replaced by the fallback.
    pub fn fail_avatar(&self, index: usize) -> bool {
        let mut avatars = self.avatars.lock();
        let Some(avatar) = avatars.get_mut(index) else {
            return false;
        };

        let swapped = avatar.fail_load();
        if swapped {
            debug!(index, src = %avatar.src(), "Avatar fell back");
        }
        swapped
    }

    /// Publishes the rendered status line to `renderer` on every change.
    pub fn attach_renderer(&self, renderer: watch::Sender<String>) {
        renderer.send_replace(self.render());
        *self.renderer.lock() = Some(renderer);
    }

    /// Renders the regions as a single status line.
    #[must_use]
    pub fn render(&self) -> String {
        let regions = self.regions.read();
        let state = regions
            .get(&TextRegion::MatchState)
            .map_or("-", String::as_str);
        let time = regions
            .get(&TextRegion::MatchTime)
            .map_or("-", String::as_str);
        format!("{state} {time}")
    }
}

impl Display for Page {
    fn set_text(&self, region: TextRegion, text: &str) {
        self.regions.write().insert(region, text.to_string());

        if let Some(renderer) = self.renderer.lock().as_ref() {
            renderer.send_replace(self.render());
        }
    }

    fn install_avatar_fallback(&self, fallback_src: &str) {
        let mut avatars = self.avatars.lock();
        for avatar in avatars.iter_mut() {
            avatar.set_fallback(fallback_src);
        }
        debug!(count = avatars.len(), fallback = %fallback_src, "Avatar fallback installed");
    }
}

/// Returns the `src` of an `<img>` tag if it carries the avatar class.
fn avatar_source(tag: &str) -> Option<String> {
    let class = attr_value(&CLASS_ATTR, tag)?;
    if !class.split_whitespace().any(|c| c == AVATAR_CLASS) {
        return None;
    }
    attr_value(&SRC_ATTR, tag).map(str::to_string)
}

fn attr_value<'a>(pattern: &Regex, tag: &'a str) -> Option<&'a str> {
    let captures = pattern.captures(tag)?;
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

// ============================================================================
// Tests
// ============================================================================
