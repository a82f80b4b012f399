//! Record filter for the display view (client-side, never mutates the buffer)
//!
//! A filter is a case-insensitive substring. The empty filter matches every
//! record. Filtering is a pure projection: it is recomputed from the buffer
//! each time the view is rendered.

use crate::buffer::Record;

/// Case-insensitive substring filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Pattern as typed by the user
    pattern: String,
    /// Lowercased pattern used for matching
    needle: String,
}

impl RecordFilter {
    /// Create a filter from user input
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            needle: pattern.to_lowercase(),
        }
    }

    /// The pattern as typed
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the filter matches everything
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Check if a record's text contains the pattern, ignoring case
    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        if self.needle.is_empty() {
            return true;
        }

        // ASCII fast path avoids allocating a lowercased copy per record
        if self.needle.is_ascii() && text.is_ascii() {
            return contains_ignore_ascii_case(text.as_bytes(), self.needle.as_bytes());
        }

        text.to_lowercase().contains(&self.needle)
    }
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// Records that match `filter`, in their original order
pub fn visible<'a, I>(records: I, filter: &RecordFilter) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
