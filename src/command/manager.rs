// CommandManager - Manages undo/redo stacks

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::project::Project;
use log::debug;
use std::collections::VecDeque;

/// Default maximum number of commands to keep in history
const DEFAULT_MAX_HISTORY: usize = 100;

/// Manages command execution and undo/redo functionality
///
/// The CommandManager maintains two stacks:
/// - Undo stack: Commands that have been executed and can be undone
/// - Redo stack: Commands that have been undone and can be redone
///
/// Executing a new command clears the redo stack. The undo stack is bounded;
/// when the limit is reached the oldest command is dropped.
pub struct CommandManager {
    /// Stack of commands that can be undone (most recent at the back)
    undo_stack: VecDeque<Box<dyn UndoableCommand>>,

    /// Stack of commands that can be redone (most recent at the back)
    redo_stack: VecDeque<Box<dyn UndoableCommand>>,

    /// Maximum number of commands to keep in history
    max_history: usize,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    /// Create a new CommandManager with a custom history limit
    pub fn with_capacity(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Execute a command and add it to the undo stack
    ///
    /// # Errors
    /// Returns the command's error; a failed command is not recorded.
    pub fn execute(
        &mut self,
        mut command: Box<dyn UndoableCommand>,
        project: &mut Project,
    ) -> CommandResult<()> {
        command.execute(project)?;
        debug!("Executed: {}", command.description());

        self.undo_stack.push_back(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }

        Ok(())
    }

    /// Undo the last command; returns its description
    pub fn undo(&mut self, project: &mut Project) -> CommandResult<String> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or(CommandError::NothingToUndo)?;

        let description = command.description();
        command.undo(project)?;
        debug!("Undone: {}", description);

        self.redo_stack.push_back(command);
        Ok(description)
    }

    /// Redo the last undone command; returns its description
    pub fn redo(&mut self, project: &mut Project) -> CommandResult<String> {
        let mut command = self
            .redo_stack
            .pop_back()
            .ok_or(CommandError::NothingToRedo)?;

        let description = command.description();
        command.execute(project)?;
        debug!("Redone: {}", description);

        self.undo_stack.push_back(command);
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    /// Description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|cmd| cmd.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}
