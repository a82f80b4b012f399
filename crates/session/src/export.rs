//! Export of the buffered records
//!
//! Export always covers the full buffer, independent of the active filter:
//! filtering is a view concern and must not silently drop history from a
//! copy. The text is handed to a `ClipboardSink`; a failed write is reported
//! but never affects the buffer.

use async_trait::async_trait;

use crate::buffer::Record;
use crate::error::Result;

/// Destination for exported text
#[async_trait]
pub trait ClipboardSink: Send + Sync + 'static {
    /// Replace the clipboard contents with `text`
    async fn write(&self, text: String) -> Result<()>;
}

/// Result of the most recent export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing exported yet
    #[default]
    Idle,
    /// Text handed to the clipboard
    Copied {
        /// Number of records exported
        records: usize,
        /// Size of the exported text in bytes
        bytes: usize,
    },
    /// Clipboard write failed
    Failed(String),
}

/// Join records with `\n` (no trailing newline)
pub fn export_text<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut text = String::new();
    for (i, record) in records.into_iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str(record);
    }
    text
}
