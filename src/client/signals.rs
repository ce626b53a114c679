/// Point-in-time view of the connection ceiling, facts only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
    /// Requests waiting for a slot.
    pub queued: usize,
}
