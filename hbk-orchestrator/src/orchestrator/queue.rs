//! Manifestation queue
//!
//! FIFO of requests waiting for admission. Membership changes only two ways:
//! - arrival (push to the back)
//! - admission (removed during a processing pass)
//!
//! A pass takes every pending request out with [`ManifestationQueue::take_pending`],
//! examines them in arrival order, and hands the ones still blocked back via
//! [`ManifestationQueue::restore`], preserving their relative order.

use std::collections::VecDeque;

use super::request::ManifestationRequest;

#[derive(Debug, Default)]
pub struct ManifestationQueue {
    pending: VecDeque<ManifestationRequest>,
}

impl ManifestationQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append a fresh arrival
    pub fn push(&mut self, request: ManifestationRequest) {
        self.pending.push_back(request);
    }

    /// Remove every pending request, oldest first
    pub fn take_pending(&mut self) -> VecDeque<ManifestationRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Put back the requests a pass did not admit
    ///
    /// Must be called before any new arrival so FIFO order is preserved.
    pub fn restore(&mut self, remaining: VecDeque<ManifestationRequest>) {
        debug_assert!(self.pending.is_empty(), "arrival during a processing pass");
        self.pending = remaining;
    }

    /// Pending requests in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &ManifestationRequest> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbk_common::SpectralSignature;
    use uuid::Uuid;

    fn create_test_request(index: usize) -> ManifestationRequest {
        ManifestationRequest {
            index,
            invocation_id: Uuid::nil(),
            collection: "segments".to_string(),
            score: 0.9,
            path: format!("test{}.wav", index),
            description: format!("Test {}", index),
            start: 0.0,
            end: 1.0,
            parameters: "[]".to_string(),
            sound_id: format!("sound-{}", index),
            signature: SpectralSignature::zero(),
            requested_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_queue_creation() {
        let queue = ManifestationQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_push_keeps_arrival_order() {
        let mut queue = ManifestationQueue::new();
        queue.push(create_test_request(1));
        queue.push(create_test_request(2));
        queue.push(create_test_request(3));

        let order: Vec<usize> = queue.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_take_and_restore_preserves_order() {
        let mut queue = ManifestationQueue::new();
        for i in 1..=4 {
            queue.push(create_test_request(i));
        }

        let pending = queue.take_pending();
        assert!(queue.is_empty());

        // Simulate a pass admitting the 2nd entry only
        let remaining: VecDeque<_> = pending.into_iter().filter(|r| r.index != 2).collect();
        queue.restore(remaining);

        let order: Vec<usize> = queue.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 4]);
    }
}
