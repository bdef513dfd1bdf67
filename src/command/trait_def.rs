// UndoableCommand trait definition

use crate::project::{Project, ProjectError};

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur during command execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The edit named something the project does not have
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Undo was called on a command that never executed
    #[error("Undo failed: {0}")]
    UndoFailed(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Trait for project edits that support undo/redo
///
/// `execute` stores whatever it needs to put the project back; `undo`
/// restores it. A command may be executed again after an undo (redo).
///
/// # Example
/// ```no_run
/// use nextbeat::command::trait_def::{CommandError, CommandResult, UndoableCommand};
/// use nextbeat::project::Project;
///
/// struct RenameCommand {
///     title: String,
///     old_title: Option<String>,
/// }
///
/// impl UndoableCommand for RenameCommand {
///     fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
///         self.old_title = Some(std::mem::replace(&mut project.metadata.title, self.title.clone()));
///         Ok(())
///     }
///
///     fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
///         let old = self
///             .old_title
///             .take()
///             .ok_or_else(|| CommandError::UndoFailed("No previous title stored".into()))?;
///         project.metadata.title = old;
///         Ok(())
///     }
///
///     fn description(&self) -> String {
///         format!("Rename to {}", self.title)
///     }
/// }
/// ```
pub trait UndoableCommand: Send {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()>;

    fn undo(&mut self, project: &mut Project) -> CommandResult<()>;

    /// Human-readable description (e.g. "Undo: Set Tempo to 128.00 BPM")
    fn description(&self) -> String;
}
