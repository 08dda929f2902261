//! User-facing error notifications.
//!
//! The cart never returns errors to its caller; instead it shows at most one
//! message per operation through a [`NotificationSink`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Messages the cart can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// Requested quantity exceeds the stock.
    QuantityUnavailable,
    /// Adding a product failed.
    AddFailed,
    /// Removing a product failed.
    RemoveFailed,
    /// Changing a quantity failed.
    UpdateFailed,
}

impl Notice {
    /// The text shown to the user.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::QuantityUnavailable => "requested quantity unavailable",
            Self::AddFailed => "error adding product",
            Self::RemoveFailed => "error removing product",
            Self::UpdateFailed => "error updating product quantity",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Fire-and-forget sink for error messages.
pub trait NotificationSink: Send + Sync {
    /// Show an error message to the user.
    fn show_error(&self, message: &str);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn show_error(&self, message: &str) {
        (**self).show_error(message);
    }
}

/// Logs each message at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show_error(&self, message: &str) {
        tracing::warn!(notification = message, "Cart notification");
    }
}

/// Forwards messages over an unbounded channel for a UI loop to drain.
///
/// Messages sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its messages.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn show_error(&self, message: &str) {
        if self.tx.send(message.to_string()).is_err() {
            tracing::debug!(notification = message, "Notification receiver dropped");
        }
    }
}
