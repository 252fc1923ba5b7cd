//! WebSocket connection management and state machine.
//!
//! A [`Connection`] runs two tasks over one upgraded stream:
//!
//! - a writer that drains the ordered send queue, one frame at a time
//! - a read loop, started by [`Connection::events`], that reassembles
//!   messages, answers Pings and echoes Close frames
//!
//! ## Connection Lifecycle
//!
//! 1. **Open** - after a successful handshake
//! 2. **Closing** - a Close frame was queued or received
//! 3. **Closed** - the transport has been shut down

mod queue;
mod reader;
mod role;
mod state;

pub use queue::{Delivery, Sender};
pub use reader::Events;
pub use role::Role;
pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
