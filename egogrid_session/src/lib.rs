//! Talks to a running game and turns its replies into observations.

mod channel;
mod recording;
mod session;
pub use channel::*;
pub use recording::*;
pub use session::*;
