//! Application message types
//!
//! Defines all messages that can be sent to the composer's update function.
//! Messages are organized by category for clear handling and routing.

use crate::surface::SurfaceId;

/// Main application message enum
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Column operations
    Column(ColumnMessage),

    /// Export operations
    Export(ExportMessage),

    /// No-op message
    None,
}

/// Column-related messages
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnMessage {
    /// A column's text input changed; carries the whole new text
    Edited { index: usize, text: String },

    /// Append an empty column
    Add,

    /// Remove the last column
    Remove,
}

/// Export-related messages
#[derive(Debug, Clone, PartialEq)]
pub enum ExportMessage {
    /// Export all columns and open the print dialog
    Requested,

    /// An export finished printing and its surface was removed
    Completed {
        surface: SurfaceId,
        /// User-facing failure description, if the export failed
        error: Option<String>,
    },
}

impl From<ColumnMessage> for Message {
    fn from(message: ColumnMessage) -> Self {
        Message::Column(message)
    }
}

impl From<ExportMessage> for Message {
    fn from(message: ExportMessage) -> Self {
        Message::Export(message)
    }
}
