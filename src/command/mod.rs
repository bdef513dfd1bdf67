// Command Pattern for Undo/Redo
//
// Every undoable project edit implements UndoableCommand; CommandManager keeps
// the bounded undo and redo stacks.

pub mod commands;
pub mod manager;
pub mod trait_def;

pub use commands::{
    AddNoteCommand, AddTrackCommand, RemoveNoteCommand, RemoveTrackCommand, SetTempoCommand,
    SetTrackMuteCommand, SetTrackSoloCommand, SetTrackVolumeCommand,
};
pub use manager::CommandManager;
pub use trait_def::{CommandError, CommandResult, UndoableCommand};
