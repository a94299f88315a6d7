use std::fmt::Display;

use crate::error::SessionError;
use crate::export::ExportLayers;

/// A yes/no question raised by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    /// Confirming throws work away
    pub destructive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPrompt {
    pub message: String,
}

/// The confirmation currently waiting on the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Leave the drawing surface and lose unsaved strokes
    Discard(ConfirmPrompt),
    /// Continue a drawing found on disk at activation
    Restore(ConfirmPrompt),
    /// Pick what to save to the album
    Export(ExportPrompt),
}

impl Confirmation {
    pub fn discard() -> Self {
        Self::Discard(ConfirmPrompt {
            title: "Warning".to_owned(),
            message: "When you return to the top screen, the history of undo and redo will be deleted."
                .to_owned(),
            confirm_label: "OK".to_owned(),
            destructive: true,
        })
    }

    pub fn restore(stroke_count: usize) -> Self {
        let noun = if stroke_count == 1 { "stroke" } else { "strokes" };
        Self::Restore(ConfirmPrompt {
            title: "Resume drawing".to_owned(),
            message: format!(
                "A paused drawing with {stroke_count} {noun} was found. Do you want to continue it?"
            ),
            confirm_label: "Resume".to_owned(),
            destructive: false,
        })
    }

    pub fn export() -> Self {
        Self::Export(ExportPrompt {
            message: "Choose what to save to the photo album.".to_owned(),
        })
    }
}

/// Answers to the export prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportChoice {
    StrokesOnly,
    Composited,
    Cancel,
}

impl ExportChoice {
    pub const ALL: [ExportChoice; 3] = [Self::StrokesOnly, Self::Composited, Self::Cancel];

    pub fn label(self) -> &'static str {
        match self {
            Self::StrokesOnly => "Save just the drawn image",
            Self::Composited => "Save also the background image",
            Self::Cancel => "Cancel",
        }
    }

    pub fn layers(self) -> Option<ExportLayers> {
        match self {
            Self::StrokesOnly => Some(ExportLayers::StrokesOnly),
            Self::Composited => Some(ExportLayers::Composited),
            Self::Cancel => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPrompt {
    pub title: String,
    pub message: String,
}

impl ErrorPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_owned(),
            message: message.into(),
        }
    }

    pub fn load_failed(cause: &impl Display) -> Self {
        Self::new(format!("Load error({cause}).\n\nPlease try again."))
    }

    pub fn not_implemented() -> Self {
        Self::new(SessionError::NotImplemented.to_string())
    }
}

/// Short notice that goes away on its own
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    /// Clock time the toast appeared
    pub shown_at: f64,
}

impl Toast {
    pub const SAVE_COMPLETE: &'static str = "Saving is complete";
}
