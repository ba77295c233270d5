//! Server-authoritative session state machine.

mod machine;

pub use machine::{ExitPrompt, TestSession};
