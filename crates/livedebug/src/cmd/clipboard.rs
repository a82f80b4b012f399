//! System clipboard sink

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use livedebug_session::{ClipboardSink, SessionError};

/// System clipboard using arboard
///
/// The clipboard is opened lazily on first write and kept open: on X11 the
/// contents are served by the owning process, so dropping it would lose them.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClipboardSink for SystemClipboard {
    async fn write(&self, text: String) -> livedebug_session::Result<()> {
        let inner = Arc::clone(&self.inner);

        // arboard blocks on the display server
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            let mut clipboard = match guard.take() {
                Some(clipboard) => clipboard,
                None => arboard::Clipboard::new()?,
            };
            let result = clipboard.set_text(text);
            *guard = Some(clipboard);
            result
        })
        .await
        .map_err(|e| SessionError::Export(e.to_string()))?
        .map_err(|e| SessionError::Export(e.to_string()))
    }
}
