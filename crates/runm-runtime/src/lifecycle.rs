//! Lifecycle transitions as a pure function of status and event.
//!
//! The controller feeds every operation through [`transition`] and then
//! performs the returned [`Effect`]. Keeping the table here means the
//! status rules can be read and tested without any I/O.

use runm_common::types::Status;

/// Something that happened to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The dispatcher asked to start the process.
    Start,
    /// The dispatcher asked to signal the process.
    Kill,
    /// The reaper reported an exit code.
    Exited(i32),
    /// The dispatcher asked to delete the process.
    Delete,
}

/// Work the controller must do after adopting the new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the status change.
    None,
    /// Check the marker and run the auxiliary launch if present.
    Launch,
    /// Deliver the requested signal.
    Signal,
    /// Record the exit code on the process record.
    RecordExit(i32),
}

/// Outcome of feeding an event to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status after the event.
    pub next: Status,
    /// Side effect to perform.
    pub effect: Effect,
}

/// Computes the transition for `event` in `current`.
///
/// Every event is accepted in every status. `Start` always lands in
/// `running`; whether a launch actually happens is up to the controller.
#[must_use]
pub const fn transition(current: Status, event: Event) -> Transition {
    match (current, event) {
        (_, Event::Start) => Transition {
            next: Status::Running,
            effect: Effect::Launch,
        },
        (Status::Stopped, Event::Kill) => Transition {
            next: Status::Stopped,
            effect: Effect::None,
        },
        (_, Event::Kill) => Transition {
            next: Status::Stopped,
            effect: Effect::Signal,
        },
        (_, Event::Exited(code)) => Transition {
            next: Status::Stopped,
            effect: Effect::RecordExit(code),
        },
        (_, Event::Delete) => Transition {
            next: Status::Deleted,
            effect: Effect::None,
        },
    }
}
