// Sequencer module
// Musical time conversion, the transport clock boundary, and live scheduling

pub mod playhead;
pub mod resolve;
pub mod scheduler;
pub mod timeline;
pub mod transport;

pub use playhead::{Playhead, SharedPlayhead};
pub use resolve::{ResolvedNote, resolve_project};
pub use scheduler::{OnsetGroup, Schedule, Scheduler, StopMode, build_schedule, enforce_monotonic};
pub use timeline::{MusicalTime, SnapGrid, Tempo, TimeBase, TimeSignature};
pub use transport::{ClockCallback, ManualClock, SystemClock, TransportClock, TransportState};
