//! Seams between a connection and the outside world
//!
//! - [`Transport`]: where framed packets go
//! - [`EventSink`]: where lifecycle and packet events go

pub mod sink;
pub mod transport;

// Re-export commonly used items
pub use sink::{Direction, EventSink, NullSink, StackEvent, TracingSink};
pub use transport::{LoopbackTransport, Transport};
