// QueueData - Addressable (bank, pattern) slots and their queue state
// State transitions are applied exclusively by the QueuePlayer

use std::collections::BTreeMap;
use std::fmt;

/// Two-level address of one stored pattern slot on the bank/pattern grid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PatternRef {
    pub bank: u8,
    pub pattern: u8,
}

impl PatternRef {
    pub fn new(bank: u8, pattern: u8) -> Self {
        Self { bank, pattern }
    }
}

impl fmt::Display for PatternRef {
    /// Grid name in the hardware style: bank letter plus 1-based pattern
    /// number, e.g. `A01`, `D16`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bank = (b'A' + self.bank.min(25)) as char;
        write!(f, "{}{:02}", bank, self.pattern + 1)
    }
}

/// Queue/playback state of one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QueueState {
    /// Not queued, not playing.
    #[default]
    Idle,
    /// Requested to start at the next measure boundary.
    Queue,
    /// Placed into a timeline and playing.
    Play,
    /// Playing, but marked to stop at its natural end.
    PlayUnqueued,
    /// Displaced or cancelled while playing; reverts to `Idle` at the next
    /// measure start.
    UnQueued,
}

impl QueueState {
    /// True for the states in which the slot's placements are live.
    pub fn is_playing(&self) -> bool {
        matches!(self, QueueState::Play | QueueState::PlayUnqueued)
    }
}

/// Per-track playback attributes of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueueDataChannel {
    track_index: usize,
    loop_enabled: bool,
}

impl QueueDataChannel {
    pub fn new(track_index: usize) -> Self {
        Self {
            track_index,
            loop_enabled: true,
        }
    }

    pub fn track_index(&self) -> usize {
        self.track_index
    }

    /// Looping placements are re-spliced measure after measure; one-shots
    /// end after a single pass.
    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }
}

/// One addressable slot on the grid.
///
/// Holds the queue state machine plus the set of tracks the slot plays on.
/// Slots are created at song load or authoring time and live until the song
/// is torn down; only the scheduler moves their state.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueData {
    pattern: PatternRef,
    state: QueueState,
    length_measures: u32,
    channels: BTreeMap<usize, QueueDataChannel>,
}

impl QueueData {
    pub fn new(pattern: PatternRef) -> Self {
        Self {
            pattern,
            state: QueueState::Idle,
            length_measures: 1,
            channels: BTreeMap::new(),
        }
    }

    pub fn pattern(&self) -> PatternRef {
        self.pattern
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: QueueState) {
        self.state = state;
    }

    /// Measures one placement of this slot spans.
    pub fn length_measures(&self) -> u32 {
        self.length_measures
    }

    pub fn set_length_measures(&mut self, length_measures: u32) {
        assert!(length_measures >= 1, "Slot must span at least one measure");
        self.length_measures = length_measures;
    }

    /// Channels in track-index order.
    pub fn channels(&self) -> impl Iterator<Item = &QueueDataChannel> {
        self.channels.values()
    }

    pub fn channel(&self, track_index: usize) -> Option<&QueueDataChannel> {
        self.channels.get(&track_index)
    }

    pub fn channel_mut(&mut self, track_index: usize) -> Option<&mut QueueDataChannel> {
        self.channels.get_mut(&track_index)
    }

    pub fn has_channel_on(&self, track_index: usize) -> bool {
        self.channels.contains_key(&track_index)
    }

    /// Indices of the tracks this slot targets.
    pub fn track_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.channels.keys().copied()
    }

    pub(crate) fn add_channel(&mut self, track_index: usize) -> &mut QueueDataChannel {
        self.channels
            .entry(track_index)
            .or_insert_with(|| QueueDataChannel::new(track_index))
    }

    pub(crate) fn remove_channel(&mut self, track_index: usize) {
        self.channels.remove(&track_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_names() {
        assert_eq!(PatternRef::new(0, 0).to_string(), "A01");
        assert_eq!(PatternRef::new(1, 9).to_string(), "B10");
        assert_eq!(PatternRef::new(3, 15).to_string(), "D16");
    }

    #[test]
    fn test_new_slot_is_idle() {
        let data = QueueData::new(PatternRef::new(0, 0));

        assert_eq!(data.state(), QueueState::Idle);
        assert_eq!(data.length_measures(), 1);
        assert_eq!(data.channels().count(), 0);
    }

    #[test]
    fn test_channels_ordered_by_track() {
        let mut data = QueueData::new(PatternRef::new(0, 0));
        data.add_channel(2);
        data.add_channel(0);
        data.add_channel(1);

        let tracks: Vec<usize> = data.track_indices().collect();
        assert_eq!(tracks, vec![0, 1, 2]);
    }

    #[test]
    fn test_add_channel_is_idempotent() {
        let mut data = QueueData::new(PatternRef::new(0, 0));
        data.add_channel(0).set_loop_enabled(false);
        data.add_channel(0);

        assert_eq!(data.channels().count(), 1);
        // re-adding must not reset attributes
        assert!(!data.channel(0).unwrap().is_loop_enabled());
    }

    #[test]
    fn test_playing_states() {
        assert!(QueueState::Play.is_playing());
        assert!(QueueState::PlayUnqueued.is_playing());
        assert!(!QueueState::Queue.is_playing());
        assert!(!QueueState::Idle.is_playing());
        assert!(!QueueState::UnQueued.is_playing());
    }

    #[test]
    #[should_panic(expected = "at least one measure")]
    fn test_zero_length_slot_rejected() {
        let mut data = QueueData::new(PatternRef::new(0, 0));
        data.set_length_measures(0);
    }
}
