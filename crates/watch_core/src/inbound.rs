use chrono::{DateTime, Utc};

/// One raw frame received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sequence: u64,
    pub raw: String,
    pub received_at: DateTime<Utc>,
}

/// Append-only log of inbound frames for one logical session.
///
/// Sequence numbers are assigned here, starting at 1, and keep increasing
/// even across `clear()`, so a sequence never names two different frames.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundLog {
    messages: Vec<InboundMessage>,
    next_sequence: u64,
    view_start: u64,
}

impl InboundLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: impl Into<String>, received_at: DateTime<Utc>) -> &InboundMessage {
        self.next_sequence += 1;
        self.messages.push(InboundMessage {
            sequence: self.next_sequence,
            raw: raw.into(),
            received_at,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sequence of the most recently appended frame, 0 if none yet.
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn iter(&self) -> impl Iterator<Item = &InboundMessage> {
        self.messages.iter()
    }

    /// Frames with `sequence >= from`, in arrival order.
    pub fn replay_from(&self, from: u64) -> &[InboundMessage] {
        let start = self.messages.partition_point(|msg| msg.sequence < from);
        &self.messages[start..]
    }

    /// Frames received since the last `mark_view()`.
    pub fn view(&self) -> &[InboundMessage] {
        self.replay_from(self.view_start)
    }

    /// Start a fresh view: frames received so far are excluded from `view()`.
    pub fn mark_view(&mut self) {
        self.view_start = self.next_sequence + 1;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.view_start = self.next_sequence + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::InboundLog;
    use chrono::Utc;

    #[test]
    fn sequences_survive_clear() {
        let mut log = InboundLog::new();
        assert_eq!(log.push("a", Utc::now()).sequence, 1);
        assert_eq!(log.push("b", Utc::now()).sequence, 2);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.push("c", Utc::now()).sequence, 3);
        assert_eq!(log.replay_from(0).len(), 1);
    }
}
