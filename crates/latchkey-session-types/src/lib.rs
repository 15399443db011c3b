//! Session transport shared by the gateway and anything sitting behind it.
//!
//! Provides session-token claims and validation, cookie builders, and the
//! `SessionToken` extractor that pulls a token out of a request.

pub mod cookie;
pub mod token;
pub mod transport;
