//! Page index newtype for safe conversion between caller page numbers and lopdf.
//!
//! Callers (forms, CLI flags) speak 1-based page numbers, Rust collections
//! are 0-based and lopdf's page map is keyed by 1-based `u32`. This type
//! keeps those conversions in one place.

use crate::error::Error;

/// What to do when a requested page does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePlacement {
    /// Reject the request with `Error::PageOutOfRange`.
    #[default]
    Strict,
    /// Fall back to the first page.
    ClampToFirst,
}

/// A validated 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(usize);

impl PageIndex {
    /// Get the index as usize for Rust collections.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Get the 1-indexed page number used as key by `lopdf::Document::get_pages`.
    #[must_use]
    pub fn as_lopdf_page_number(self) -> u32 {
        u32::try_from(self.0 + 1).unwrap_or(u32::MAX)
    }

    /// Convert a 1-based page number from a caller.
    ///
    /// Page 0 and pages past the end are out of range; with
    /// `PagePlacement::ClampToFirst` they resolve to the first page instead.
    pub fn from_one_based(
        page: usize,
        total_pages: usize,
        placement: PagePlacement,
    ) -> Result<Self, Error> {
        let in_range = page >= 1 && page <= total_pages;
        match (in_range, placement) {
            (true, _) => Ok(Self(page - 1)),
            (false, PagePlacement::ClampToFirst) if total_pages > 0 => {
                tracing::debug!("Page {} out of range (1..={}), using page 1", page, total_pages);
                Ok(Self(0))
            }
            _ => Err(Error::PageOutOfRange {
                page,
                total: total_pages,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_one_based_strict() {
        let idx = PageIndex::from_one_based(3, 3, PagePlacement::Strict).unwrap();
        assert_eq!(idx.as_usize(), 2);

        assert!(PageIndex::from_one_based(0, 3, PagePlacement::Strict).is_err());
        assert!(PageIndex::from_one_based(4, 3, PagePlacement::Strict).is_err());
    }

    #[test]
    fn test_from_one_based_clamped() {
        let idx = PageIndex::from_one_based(9, 3, PagePlacement::ClampToFirst).unwrap();
        assert_eq!(idx.as_usize(), 0);

        let idx = PageIndex::from_one_based(0, 3, PagePlacement::ClampToFirst).unwrap();
        assert_eq!(idx.as_usize(), 0);

        // Nothing to clamp to in an empty document
        assert!(PageIndex::from_one_based(1, 0, PagePlacement::ClampToFirst).is_err());
    }

    #[test]
    fn test_as_lopdf_page_number() {
        let idx = PageIndex::from_one_based(1, 1, PagePlacement::Strict).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 1);

        let idx = PageIndex::from_one_based(6, 6, PagePlacement::Strict).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 6);
    }
}
