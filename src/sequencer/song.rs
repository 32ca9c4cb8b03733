// QueueSong - Owns the track list and the bank/pattern slot grid
// The serializable authoring and snapshot unit

use crate::sequencer::queue_data::{PatternRef, QueueData, QueueDataChannel};
use crate::sequencer::timeline::TrackTimeline;
use std::collections::BTreeMap;

/// Authoring-boundary errors.
///
/// Scheduler passes never return these; inside the scheduler a missing
/// track or slot is a caller bug and is handled as a contract violation.
#[derive(Debug, thiserror::Error)]
pub enum SongError {
    #[error("track {0} already exists")]
    DuplicateTrack(usize),

    #[error("no track with index {0}")]
    UnknownTrack(usize),

    #[error("no slot {0} on the grid")]
    UnknownSlot(PatternRef),
}

/// One engine voice channel and its scheduled placements.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    index: usize,
    timeline: TrackTimeline,
}

impl Track {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            timeline: TrackTimeline::new(),
        }
    }

    /// Stable index for the song's lifetime.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timeline(&self) -> &TrackTimeline {
        &self.timeline
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut TrackTimeline {
        &mut self.timeline
    }
}

/// The song: tracks plus the slot grid.
///
/// Tracks are created and destroyed only through the sequencer facade, in
/// lockstep with engine voice-channel commands. The whole song serializes;
/// `QueueSequencer::snapshot` hands out deep copies as the persistence unit.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueSong {
    tracks: BTreeMap<usize, Track>,
    slots: Vec<QueueData>,
}

impl QueueSong {
    pub fn new() -> Self {
        Self::default()
    }

    //----------------------------------
    // tracks
    //----------------------------------

    /// Tracks in index order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(&index)
    }

    pub(crate) fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(&index)
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub(crate) fn add_track(&mut self, index: usize) -> Result<(), SongError> {
        if self.tracks.contains_key(&index) {
            return Err(SongError::DuplicateTrack(index));
        }
        self.tracks.insert(index, Track::new(index));
        Ok(())
    }

    pub(crate) fn remove_track(&mut self, index: usize) -> Result<(), SongError> {
        self.tracks
            .remove(&index)
            .ok_or(SongError::UnknownTrack(index))?;
        // channels pointing at the dead track go with it
        for slot in &mut self.slots {
            slot.remove_channel(index);
        }
        Ok(())
    }

    //----------------------------------
    // slots
    //----------------------------------

    /// All slots, in authoring order.
    pub fn slots(&self) -> &[QueueData] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [QueueData] {
        &mut self.slots
    }

    /// Get or create the slot for `pattern`.
    pub fn add_slot(&mut self, pattern: PatternRef) -> &mut QueueData {
        let index = match self.slots.iter().position(|d| d.pattern() == pattern) {
            Some(index) => index,
            None => {
                self.slots.push(QueueData::new(pattern));
                self.slots.len() - 1
            }
        };
        &mut self.slots[index]
    }

    /// Register `pattern` to play on `track_index`. The track and the slot
    /// must already exist.
    pub fn add_channel(
        &mut self,
        pattern: PatternRef,
        track_index: usize,
    ) -> Result<&mut QueueDataChannel, SongError> {
        if !self.tracks.contains_key(&track_index) {
            return Err(SongError::UnknownTrack(track_index));
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|d| d.pattern() == pattern)
            .ok_or(SongError::UnknownSlot(pattern))?;
        Ok(slot.add_channel(track_index))
    }

    pub fn queue_data(&self, pattern: PatternRef) -> Option<&QueueData> {
        self.slots.iter().find(|d| d.pattern() == pattern)
    }

    pub(crate) fn queue_data_mut(&mut self, pattern: PatternRef) -> Option<&mut QueueData> {
        self.slots.iter_mut().find(|d| d.pattern() == pattern)
    }

    pub fn channel(&self, pattern: PatternRef, track_index: usize) -> Option<&QueueDataChannel> {
        self.queue_data(pattern).and_then(|d| d.channel(track_index))
    }

    pub fn channel_mut(
        &mut self,
        pattern: PatternRef,
        track_index: usize,
    ) -> Option<&mut QueueDataChannel> {
        self.queue_data_mut(pattern)
            .and_then(|d| d.channel_mut(track_index))
    }

    /// Per-bank snapshot view for a pad/grid UI: pattern index -> slot.
    pub fn view(&self, bank: u8) -> BTreeMap<u8, &QueueData> {
        self.slots
            .iter()
            .filter(|d| d.pattern().bank == bank)
            .map(|d| (d.pattern().pattern, d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::queue_data::QueueState;

    fn a01() -> PatternRef {
        PatternRef::new(0, 0)
    }

    #[test]
    fn test_track_management() {
        let mut song = QueueSong::new();
        assert!(!song.has_tracks());

        song.add_track(0).unwrap();
        song.add_track(1).unwrap();
        assert_eq!(song.track_count(), 2);
        assert!(song.track(1).is_some());

        assert!(matches!(
            song.add_track(0),
            Err(SongError::DuplicateTrack(0))
        ));

        song.remove_track(0).unwrap();
        assert!(song.track(0).is_none());
        assert!(matches!(
            song.remove_track(0),
            Err(SongError::UnknownTrack(0))
        ));
    }

    #[test]
    fn test_slot_creation_is_idempotent() {
        let mut song = QueueSong::new();

        song.add_slot(a01()).set_length_measures(2);
        song.add_slot(a01());

        assert_eq!(song.slots().len(), 1);
        assert_eq!(song.queue_data(a01()).unwrap().length_measures(), 2);
    }

    #[test]
    fn test_add_channel_requires_track_and_slot() {
        let mut song = QueueSong::new();
        song.add_track(0).unwrap();

        assert!(matches!(
            song.add_channel(a01(), 1),
            Err(SongError::UnknownTrack(1))
        ));
        assert!(matches!(
            song.add_channel(a01(), 0),
            Err(SongError::UnknownSlot(_))
        ));

        song.add_slot(a01());
        song.add_channel(a01(), 0).unwrap();
        assert!(song.channel(a01(), 0).is_some());
    }

    #[test]
    fn test_removing_track_drops_its_channels() {
        let mut song = QueueSong::new();
        song.add_track(0).unwrap();
        song.add_slot(a01());
        song.add_channel(a01(), 0).unwrap();

        song.remove_track(0).unwrap();

        assert!(!song.queue_data(a01()).unwrap().has_channel_on(0));
    }

    #[test]
    fn test_bank_view() {
        let mut song = QueueSong::new();
        song.add_slot(PatternRef::new(0, 0));
        song.add_slot(PatternRef::new(0, 3));
        song.add_slot(PatternRef::new(1, 0));

        let view = song.view(0);
        assert_eq!(view.len(), 2);
        assert!(view.contains_key(&0));
        assert!(view.contains_key(&3));

        assert_eq!(song.view(2).len(), 0);
    }

    #[test]
    fn test_song_snapshot_round_trip() {
        let mut song = QueueSong::new();
        song.add_track(0).unwrap();
        song.add_track(1).unwrap();
        song.add_slot(a01()).set_length_measures(2);
        song.add_channel(a01(), 0).unwrap().set_loop_enabled(false);
        song.queue_data_mut(a01()).unwrap().set_state(QueueState::Play);
        song.track_mut(0)
            .unwrap()
            .timeline_mut()
            .splice_at(3, 2, a01(), false, false);

        let json = serde_json::to_string(&song).unwrap();
        let restored: QueueSong = serde_json::from_str(&json).unwrap();

        assert_eq!(song, restored);
    }
}
