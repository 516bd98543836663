//! Wispwell: Dialogue participants.
//!
//! A [`participant::TurnParticipant`] speaks for one character: it polls the
//! shared scene state, and when the character is due it delivers the line,
//! waits, and asks the coordinator to advance.

pub mod delivery;
pub mod monitor;
pub mod participant;
pub mod settings;
