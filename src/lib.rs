//! Toggles the away status of every live connection after the user has been idle for a while.
//! The crate is split the same way a host loads it: [plugin] is the facade the host talks to,
//! [monitor] is the polling engine, [presence] and [idle_api] are the seams to the host's
//! connections and the operating system.
//!

pub mod args;
pub mod idle_api;
pub mod monitor;
pub mod plugin;
pub mod presence;
pub mod utils;
