use super::Command;
use crate::document::DrawingDocument;

/// Manages the history of canvas edits for undo/redo
#[derive(Debug, Default)]
pub struct CommandHistory {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command and record it
    pub fn execute(&mut self, command: Command, document: &mut DrawingDocument) {
        command.execute(document);
        self.undo_stack.push(command);
        self.redo_stack.clear(); // A new edit invalidates whatever was undone
    }

    /// Undo the last command. Returns false when there was nothing to undo.
    pub fn undo(&mut self, document: &mut DrawingDocument) -> bool {
        match self.undo_stack.pop() {
            Some(command) => {
                command.undo(document);
                self.redo_stack.push(command);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone command. Returns false when there was nothing to redo.
    pub fn redo(&mut self, document: &mut DrawingDocument) -> bool {
        match self.redo_stack.pop() {
            Some(command) => {
                command.execute(document);
                self.undo_stack.push(command);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
