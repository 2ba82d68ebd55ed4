//! Byte transport, line protocol and I/O queues for VTTY.
//!
//! The host supplies a [`Transport`]; [`VttyIo`] polls it, decodes command
//! lines with [`LineDecoder`] and hands them out through [`VttyIo::read`].
//! Text printed through [`Output`] is written back to the transport by a
//! dedicated output unit.

pub mod line;
pub mod memory;
pub mod queue;
pub mod runtime;
pub mod transport;

/// One decoded command line and its classification.
pub use line::{CommandLine, InputState, LineDecoder};
/// In-memory transport for hosts without hardware I/O, and for tests.
pub use memory::MemoryTransport;
/// Output queue handle and buffered writer.
pub use queue::{InputQueue, Output, PendingOutput};
/// Threaded runtime over one transport.
pub use runtime::VttyIo;
/// Byte-level I/O primitive implemented by the host.
pub use transport::Transport;
