use serde::{Deserialize, Serialize};

/// Message counts per queue lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    pub ready: usize,
    pub delayed: usize,
    pub in_flight: usize,
    pub dead_letter: usize,
}
