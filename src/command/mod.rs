mod history;

use crate::document::DrawingDocument;
use crate::stroke::Stroke;

pub use history::CommandHistory;

/// Canvas edits that can be undone and redone
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Appends a stroke to the document
    AddStroke(Stroke),
    /// Removes the stroke at `index`, keeping it for undo
    EraseStroke { index: usize, stroke: Stroke },
}

impl Command {
    pub fn execute(&self, document: &mut DrawingDocument) {
        match self {
            Command::AddStroke(stroke) => document.add_stroke(stroke.clone()),
            Command::EraseStroke { index, .. } => {
                document.remove_stroke(*index);
            }
        }
    }

    pub fn undo(&self, document: &mut DrawingDocument) {
        match self {
            Command::AddStroke(_) => {
                document.remove_last_stroke();
            }
            Command::EraseStroke { index, stroke } => {
                document.insert_stroke(*index, stroke.clone());
            }
        }
    }
}
