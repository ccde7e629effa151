use core_types::GridEvent;

pub mod grid;
pub use grid::GridFramer;

/// Trait for converting a stream of serial bytes into decoded device events.
pub trait Framer: Send {
    /// Ingest new bytes and return any complete events found.
    ///
    /// The OS hands the caller arbitrary chunks; partial frames are
    /// buffered across calls.
    fn push(&mut self, bytes: &[u8]) -> Vec<GridEvent>;

    /// Reset internal state (e.g., clear buffers).
    fn reset(&mut self);

    /// Get the name of the framer.
    fn name(&self) -> &'static str;
}
