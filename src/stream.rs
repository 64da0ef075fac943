//! Channel-backed value streams and the combine-latest operator.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Tracks the latest value of each source.
///
/// Once every source has produced at least one value, each update yields
/// the full tuple of latest values.
#[derive(Debug, Clone)]
pub struct CombineLatest<T> {
    slots: Vec<Option<T>>,
}

impl<T: Clone> CombineLatest<T> {
    pub fn new(sources: usize) -> Self {
        Self {
            slots: vec![None; sources],
        }
    }

    /// Record `value` for `slot`. Returns the combined values if every slot
    /// is filled. Updates to unknown slots are ignored.
    pub fn update(&mut self, slot: usize, value: T) -> Option<Vec<T>> {
        *self.slots.get_mut(slot)? = Some(value);
        self.slots.iter().cloned().collect()
    }

    pub fn is_ready(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn sources(&self) -> usize {
        self.slots.len()
    }
}

/// Publishes values into one slot of a merged stream.
#[derive(Debug)]
pub struct SlotSender<T> {
    slot: usize,
    tx: UnboundedSender<(usize, T)>,
}

impl<T> SlotSender<T> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Send a value. Returns false once the merged stream has been dropped.
    pub fn send(&self, value: T) -> bool {
        self.tx.send((self.slot, value)).is_ok()
    }
}

/// Builder for a set of sources merged into one tagged channel.
pub struct MergedStream<T> {
    tx: UnboundedSender<(usize, T)>,
    rx: UnboundedReceiver<(usize, T)>,
    sources: usize,
}

impl<T> Default for MergedStream<T> {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, sources: 0 }
    }
}

impl<T: Clone + Send + 'static> MergedStream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source, seeded with `initial`.
    pub fn source(&mut self, initial: T) -> SlotSender<T> {
        let sender = SlotSender {
            slot: self.sources,
            tx: self.tx.clone(),
        };
        self.sources += 1;
        sender.send(initial);
        sender
    }

    /// Spawn the combine-latest operator over every registered source.
    ///
    /// The output closes once every [`SlotSender`] has been dropped.
    pub fn combine_latest(self) -> UnboundedReceiver<Vec<T>> {
        let MergedStream { tx, mut rx, sources } = self;
        drop(tx);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut latest = CombineLatest::new(sources);
            while let Some((slot, value)) = rx.recv().await {
                if let Some(values) = latest.update(slot, value) {
                    if out_tx.send(values).is_err() {
                        break;
                    }
                }
            }
        });
        out_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waits_for_every_source() {
        let mut latest = CombineLatest::new(3);
        assert_eq!(latest.update(0, "a"), None);
        assert_eq!(latest.update(2, "c"), None);
        assert!(!latest.is_ready());
        assert_eq!(latest.update(1, "b"), Some(vec!["a", "b", "c"]));
        assert!(latest.is_ready());
    }

    #[test]
    fn test_update_keeps_other_values() {
        let mut latest = CombineLatest::new(2);
        latest.update(0, 1);
        latest.update(1, 2);
        assert_eq!(latest.update(0, 10), Some(vec![10, 2]));
        assert_eq!(latest.update(0, 10), Some(vec![10, 2]));
    }

    #[test]
    fn test_unknown_slot_ignored() {
        let mut latest = CombineLatest::new(1);
        assert_eq!(latest.update(5, 'x'), None);
        assert_eq!(latest.sources(), 1);
    }

    #[tokio::test]
    async fn test_merged_stream_emits_on_any_change() {
        let mut merged = MergedStream::new();
        let left = merged.source("l0".to_string());
        let right = merged.source("r0".to_string());
        let mut combined = merged.combine_latest();

        assert_eq!(combined.recv().await.unwrap(), vec!["l0", "r0"]);

        assert!(right.send("r1".to_string()));
        assert_eq!(combined.recv().await.unwrap(), vec!["l0", "r1"]);

        assert!(left.send("l1".to_string()));
        assert_eq!(combined.recv().await.unwrap(), vec!["l1", "r1"]);

        drop(left);
        drop(right);
        assert!(combined.recv().await.is_none());
    }
}
