//! Best-effort text clipboard.

use std::sync::Arc;

use maybe_sync::{MaybeSend, MaybeSync};
use parking_lot::Mutex;
use pinged_types::geo::{GeoPoint, GeoPoint2d};

use crate::error::ClipboardError;

/// System clipboard.
pub trait Clipboard: MaybeSend + MaybeSync {
    /// Replaces the clipboard contents with the text.
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard kept in memory. Clones share the contents.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    /// Creates an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

/// Clipboard of a platform that doesn't give access to one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable(
            "clipboard is not supported".to_string(),
        ))
    }
}

/// Formats a point as `lat, lng` with 5 decimal places (about a meter).
pub fn format_coordinates(point: &GeoPoint2d) -> String {
    format!("{:.5}, {:.5}", point.lat(), point.lon())
}
