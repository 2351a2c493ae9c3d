//! Relay authentication
//!
//! Session cookies for the Axiom relay, rotated in the background.

mod session;

pub use session::{AuthError, AuthSession, REFRESH_INTERVAL, REFRESH_URL};
