//! Avatar image element.

// ============================================================================
// Avatar
// ============================================================================

/// A team avatar image.
///
/// When an error fallback is installed, a failed load swaps the source to
/// the fallback image. A failure of the fallback itself is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    /// Current image source.
    src: String,
    /// Source used after a failed load.
    fallback: Option<String>,
}

impl Avatar {
    /// Creates an avatar with no fallback.
    #[inline]
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            fallback: None,
        }
    }

    /// Returns the current image source.
    #[inline]
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Returns the installed fallback source.
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Sets the image source.
    #[inline]
    pub fn set_src(&mut self, src: impl Into<String>) {
        self.src = src.into();
    }

    /// Installs the error fallback source.
    #[inline]
    pub fn set_fallback(&mut self, fallback: impl Into<String>) {
        self.fallback = Some(fallback.into());
    }

    /// Reports that the current source failed to load.
    ///
    /// Returns `true` if the source was replaced by the fallback.
    pub fn fail_load(&mut self) -> bool {
        match &self.fallback {
            Some(fallback) if *fallback != self.src => {
                self.src.clone_from(fallback);
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
