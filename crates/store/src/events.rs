//! Change notifications for consumers of the store

/// Buffered notifications per subscriber before the slowest one starts lagging
pub const EVENT_CAPACITY: usize = 64;

/// What happened to the store. Consumers re-read whatever they display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Ratings were wiped by `clear_all` or a session change
    RatingsCleared,
    /// Any other local mutation
    Updated,
    /// Remote state was merged in
    LoadedFromRemote,
}
