//! Explicit page position for listing polls.
//!
//! Every provider call receives a cursor so that two polls of the same
//! listing are distinguishable in logs and, when the source supports it,
//! address different pages.

/// Position of one poll within an ingestion run (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCursor {
    page: u32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

impl PageCursor {
    #[must_use]
    pub const fn first() -> Self {
        Self { page: 1 }
    }

    /// Cursor for a specific page; page 0 is clamped to the first page
    #[must_use]
    pub const fn at(page: u32) -> Self {
        if page == 0 { Self::first() } else { Self { page } }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
        }
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}", self.page)
    }
}
