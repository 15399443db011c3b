//! sea-orm entities for the gateway's Postgres schema.

pub mod login_attempts;
pub mod outbox_events;
pub mod sessions;
pub mod users;
