//! Session registry: the relay's single piece of shared state.

mod session;

pub use session::{SessionRecord, SessionRegistry};
