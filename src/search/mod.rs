//! In-memory filtering, ordering and pagination of catalogue listings.

mod events;
mod structures;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use getset::Getters;
use serde::{Deserialize, Serialize};

pub use events::{EventSearchParams, EventSortField, search_events};
pub use structures::{StructureSearchParams, StructureSortField, search_structures};

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Applies the direction to an ascending comparison.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Page size bounds applied to every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Resolves a requested 1-based page and size. Page 0 is read as page 1.
    pub fn resolve(&self, page: Option<usize>, page_size: Option<usize>) -> (usize, usize) {
        let page = page.unwrap_or(1).max(1);
        let size = page_size
            .unwrap_or(self.default_size)
            .clamp(1, self.max_size.max(1));
        (page, size)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
#[getset(get = "pub")]
pub struct Page<T> {
    items: Vec<T>,
    page: usize,
    page_size: usize,
    total_items: usize,
    total_pages: usize,
}

impl<T> Page<T> {
    /// A page as reported by a server that paginated on its side.
    pub fn new(items: Vec<T>, page: usize, page_size: usize, total_items: usize, total_pages: usize) -> Self {
        Self {
            items,
            page,
            page_size,
            total_items,
            total_pages,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Slices `items` to the requested page. A page past the end is empty.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let offset = (page - 1).saturating_mul(page_size);

    let items = items.into_iter().skip(offset).take(page_size).collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Case-insensitive substring test. `needle` must already be lowercase.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Trims and lowercases a free-text criterion; blank means "not applied".
pub(crate) fn normalize_text(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_everything_once() {
        let items: Vec<u32> = (0..23).collect();
        let mut seen = Vec::new();
        for page in 1..=3 {
            let p = paginate(items.clone(), page, 10);
            assert!(p.items().len() <= 10);
            assert_eq!(*p.total_pages(), 3);
            seen.extend(p.into_items());
        }
        assert_eq!(seen, items);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let p = paginate(vec![1, 2, 3], 5, 2);
        assert!(p.items().is_empty());
        assert_eq!(*p.total_items(), 3);
        assert_eq!(*p.total_pages(), 2);
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let p = paginate(Vec::<u8>::new(), 1, 12);
        assert_eq!(*p.total_pages(), 0);
        assert!(p.is_last());
    }

    #[test]
    fn limits_resolve_defaults_and_clamp() {
        let limits = PageLimits::default();
        assert_eq!(limits.resolve(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(limits.resolve(Some(0), Some(0)), (1, 1));
        assert_eq!(limits.resolve(Some(4), Some(1_000)), (4, MAX_PAGE_SIZE));
    }

    #[test]
    fn direction_reverses() {
        assert_eq!(SortDirection::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortDirection::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!("DESC".parse(), Ok(SortDirection::Desc));
    }
}
