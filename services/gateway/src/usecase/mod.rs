pub mod issue;
pub mod reaper;
pub mod session;
pub mod verify;
