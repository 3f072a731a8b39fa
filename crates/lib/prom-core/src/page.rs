//! Pagination and filtering over ordered collections.
//!
//! [`paginate_and_filter`] is a pure function shared by every listing tool:
//! prefix/pattern filters first, then offset/limit slicing, then `has_more`
//! bookkeeping. Bad bounds and bad patterns are hard errors, never a silent
//! no-match.

use std::error::Error;
use std::fmt;

use regex::Regex;
use serde::Serialize;

/// Page bounds as supplied by the caller.
///
/// Unset limit means no cap; unset offset means 0. Bounds are kept as raw
/// integers so out-of-range values reach [`PageError`] instead of failing
/// schema decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageRequest {
    /// True when the caller asked for any slicing at all.
    #[must_use]
    pub const fn requested(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Checks bounds without slicing anything.
    ///
    /// # Errors
    /// Returns `PageError` for a non-positive limit or a negative offset.
    pub fn validate(&self) -> Result<(), PageError> {
        self.bounds().map(|_| ())
    }

    fn bounds(&self) -> Result<(Option<usize>, usize), PageError> {
        let limit = match self.limit {
            Some(limit) if limit <= 0 => return Err(PageError::NonPositiveLimit(limit)),
            Some(limit) => Some(usize::try_from(limit).unwrap_or(usize::MAX)),
            None => None,
        };
        let offset = match self.offset {
            Some(offset) if offset < 0 => return Err(PageError::NegativeOffset(offset)),
            Some(offset) => usize::try_from(offset).unwrap_or(usize::MAX),
            None => 0,
        };
        Ok((limit, offset))
    }
}

/// Prefix and pattern filters, applied conjunctively when both are set.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub prefix: Option<String>,
    pub pattern: Option<String>,
}

impl FilterSpec {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.pattern.is_none()
    }
}

#[derive(Debug)]
pub enum PageError {
    NonPositiveLimit(i64),
    NegativeOffset(i64),
    InvalidPattern(regex::Error),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveLimit(limit) => write!(f, "limit must be positive, got {limit}"),
            Self::NegativeOffset(offset) => {
                write!(f, "offset must not be negative, got {offset}")
            }
            Self::InvalidPattern(err) => write!(f, "invalid filter pattern: {err}"),
        }
    }
}

impl Error for PageError {}

/// Pagination metadata returned alongside every sliced collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total_count: usize,
    pub returned_count: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// A sliced collection plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// Filters `items` by `filter` keyed through `key_fn`, then slices the
/// survivors by `page`.
///
/// The prefix filter matches case-sensitively at position 0; the pattern
/// filter matches the compiled regex anywhere in the key. `total_count`
/// always reflects the filtered collection. An offset beyond the end yields
/// an empty page, not an error.
///
/// # Errors
/// Returns `PageError` for a non-positive limit, a negative offset, or a
/// pattern that does not compile.
pub fn paginate_and_filter<T, K>(
    items: Vec<T>,
    filter: &FilterSpec,
    page: PageRequest,
    key_fn: K,
) -> Result<PageResult<T>, PageError>
where
    K: Fn(&T) -> String,
{
    let (limit, offset) = page.bounds()?;
    let pattern = filter
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(PageError::InvalidPattern)?;

    let filtered: Vec<T> = if filter.is_empty() {
        items
    } else {
        items
            .into_iter()
            .filter(|item| {
                let key = key_fn(item);
                filter
                    .prefix
                    .as_deref()
                    .is_none_or(|prefix| key.starts_with(prefix))
                    && pattern.as_ref().is_none_or(|re| re.is_match(&key))
            })
            .collect()
    };

    let total_count = filtered.len();
    let items: Vec<T> = match limit {
        Some(limit) => filtered.into_iter().skip(offset).take(limit).collect(),
        None => filtered.into_iter().skip(offset).collect(),
    };
    let returned_count = items.len();
    let has_more = offset.saturating_add(returned_count) < total_count;

    Ok(PageResult {
        items,
        meta: PageMeta {
            total_count,
            returned_count,
            offset,
            has_more,
        },
    })
}
