// QueuePlayer - The live queue scheduler
// Promotes queued slots at measure boundaries and keeps timelines spliced

use crate::messaging::channels::{CommandProducer, NotificationProducer};
use crate::messaging::command::{EngineCommand, TransportMode};
use crate::messaging::notification::ChangeNotification;
use crate::sequencer::clock::SequencerClock;
use crate::sequencer::queue_data::{PatternRef, QueueData, QueueDataChannel, QueueState};
use crate::sequencer::song::{QueueSong, SongError};
use ringbuf::traits::Producer;
use std::collections::BTreeMap;

/// The scheduler driving the queue state machine from engine beat ticks.
///
/// All scheduling runs on measure boundaries: slots queued during a measure
/// are spliced into timelines on the lock beat (the measure's last beat) and
/// counted as playing once the next measure actually starts. The split keeps
/// material queued one tick ahead of the boundary that plays it, while the
/// bookkeeping a UI can observe only ever changes on the start edge.
pub struct QueuePlayer {
    clock: SequencerClock,
    /// Slots whose placements are live in a timeline.
    play_queue: Vec<PatternRef>,
    /// Slots spliced on the lock beat, promoted to `Play` on the next
    /// start edge.
    pending_promote: Vec<PatternRef>,
    /// Slots armed to start at the next boundary.
    queued: Vec<PatternRef>,
    /// Slots that stopped on the lock beat; finalized to `Idle` on the next
    /// start edge unless re-queued in between.
    flushed: Vec<PatternRef>,
    audio_enabled: bool,
    commands: CommandProducer,
    notifications: NotificationProducer,
}

impl QueuePlayer {
    pub fn new(commands: CommandProducer, notifications: NotificationProducer) -> Self {
        Self {
            clock: SequencerClock::new(),
            play_queue: Vec::new(),
            pending_promote: Vec::new(),
            queued: Vec::new(),
            flushed: Vec::new(),
            audio_enabled: true,
            commands,
            notifications,
        }
    }

    pub fn clock(&self) -> &SequencerClock {
        &self.clock
    }

    /// When disabled, transport commands are not sent. Queue and timeline
    /// bookkeeping is unaffected, which lets an engine-less host drive the
    /// scheduler purely from synthetic ticks.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Toggle a slot's queue intent.
    ///
    /// Returns `false` when called during the lock beat: decisions are
    /// frozen while the measure rolls over, and the caller retries on a
    /// later tick. Otherwise applies one transition of the state machine:
    /// `Idle -> Queue`, `Queue -> Idle`, `Play <-> PlayUnqueued`.
    ///
    /// Queueing a slot synchronously forces any slot playing on one of the
    /// same tracks to `UnQueued`, so a track never ends up with two playing
    /// slots after the boundary.
    pub fn touch(&mut self, song: &mut QueueSong, pattern: PatternRef) -> bool {
        if self.clock.is_lock_beat() {
            log::debug!("touch({pattern}) rejected on lock beat");
            return false;
        }
        let Some(state) = song.queue_data(pattern).map(|d| d.state()) else {
            debug_assert!(false, "touch on unknown slot {pattern}");
            return false;
        };
        log::debug!("touch({pattern}) in {state:?}");

        if self.play_queue.contains(&pattern) {
            match state {
                QueueState::Play => self.set_state(song, pattern, QueueState::PlayUnqueued),
                QueueState::PlayUnqueued => self.set_state(song, pattern, QueueState::Play),
                // displaced by a conflicting slot; it runs out at the
                // boundary and can be re-queued after that
                _ => {}
            }
        } else if !self.queued.contains(&pattern) {
            for conflicting in self.conflicting_playing_slots(song, pattern) {
                self.set_state(song, conflicting, QueueState::UnQueued);
            }
            self.queued.push(pattern);
            self.set_state(song, pattern, QueueState::Queue);
        } else {
            self.queued.retain(|p| *p != pattern);
            self.set_state(song, pattern, QueueState::Idle);
        }
        true
    }

    /// Start everything that is armed, immediately.
    ///
    /// Queued slots are spliced at the current measure and counted as
    /// playing right away, then the engine transport is started. Used for
    /// the initial "start the armed set" action rather than a boundary
    /// swap.
    pub fn play(&mut self, song: &mut QueueSong) {
        let measure = self.clock.measure();
        let armed = self.armed_slots(song);
        for pattern in armed {
            self.splice_for_all_channels(song, pattern, measure);
            self.queued.retain(|p| *p != pattern);
            self.play_queue.push(pattern);
            self.set_state(song, pattern, QueueState::Play);
        }
        if self.audio_enabled {
            self.send(EngineCommand::TransportStart {
                mode: TransportMode::Song,
            });
        }
        log::debug!("play at measure {measure}");
    }

    /// Stop the engine transport.
    ///
    /// Queue and playing state is left intact so a later `play` resumes
    /// the same arrangement deterministically.
    pub fn stop(&mut self) {
        self.send(EngineCommand::TransportStop);
        log::debug!("stop");
    }

    /// The tick entry point, called once per engine beat callback.
    pub fn beat_change(&mut self, song: &mut QueueSong, measure: i32, beat: f32) {
        let edges = self.clock.on_tick(measure, beat);
        log::trace!(
            "tick measure={} beat={} local={}",
            self.clock.measure(),
            self.clock.beat(),
            self.clock.local_beat()
        );

        if edges.start_of_measure {
            self.promote_pending(song);
            self.finalize_flushed(song);
        }
        if edges.lock_beat {
            self.extend_or_remove_playing(song);
            self.promote_queued(song);
        }
    }

    //----------------------------------
    // boundary passes
    //----------------------------------

    /// Start edge: slots spliced on the previous lock beat become playing.
    fn promote_pending(&mut self, song: &mut QueueSong) {
        let pending = std::mem::take(&mut self.pending_promote);
        for pattern in pending {
            self.play_queue.push(pattern);
            self.set_state(song, pattern, QueueState::Play);
        }
    }

    /// Start edge: slots that stopped on the previous lock beat settle to
    /// `Idle`, unless they were re-queued in the interim.
    fn finalize_flushed(&mut self, song: &mut QueueSong) {
        let flushed = std::mem::take(&mut self.flushed);
        for pattern in flushed {
            let requeued = song
                .queue_data(pattern)
                .is_some_and(|d| d.state() == QueueState::Queue);
            if !requeued {
                self.set_state(song, pattern, QueueState::Idle);
            }
        }
    }

    /// Lock beat, first pass: every placement ending at the next measure
    /// either extends (looping, still playing) or takes its slot out of the
    /// play queue.
    fn extend_or_remove_playing(&mut self, song: &mut QueueSong) {
        let next_measure = self.clock.measure() + 1;

        // decide first, then apply, so splices don't shift what we iterate
        let ending: Vec<(usize, PatternRef)> = song
            .tracks()
            .filter_map(|t| {
                t.timeline()
                    .placement_ending_at(next_measure)
                    .map(|p| (t.index(), p.pattern))
            })
            .collect();

        for (track_index, pattern) in ending {
            let Some(data) = song.queue_data(pattern) else {
                debug_assert!(false, "placement for unknown slot {pattern}");
                continue;
            };
            let state = data.state();
            let loops = data
                .channel(track_index)
                .map(|c| c.is_loop_enabled())
                .unwrap_or_else(|| {
                    debug_assert!(
                        false,
                        "slot {pattern} has no channel on track {track_index}"
                    );
                    false
                });

            match state {
                QueueState::UnQueued => self.stop_playing(song, pattern),
                QueueState::Play if loops => {
                    self.splice(song, pattern, track_index, next_measure);
                }
                // one-shots and slots marked to stop end here
                _ => self.stop_playing(song, pattern),
            }
        }
    }

    /// Lock beat, second pass: splice every armed slot at the next measure
    /// and park it for promotion on the start edge.
    fn promote_queued(&mut self, song: &mut QueueSong) {
        let next_measure = self.clock.measure() + 1;
        let armed = self.armed_slots(song);
        for pattern in armed {
            self.splice_for_all_channels(song, pattern, next_measure);
            self.queued.retain(|p| *p != pattern);
            self.pending_promote.push(pattern);
        }
    }

    //----------------------------------
    // helpers
    //----------------------------------

    fn armed_slots(&self, song: &QueueSong) -> Vec<PatternRef> {
        self.queued
            .iter()
            .copied()
            .filter(|p| {
                song.queue_data(*p)
                    .is_some_and(|d| d.state() == QueueState::Queue)
            })
            .collect()
    }

    /// Playing slots that share a track with `pattern`'s channels.
    fn conflicting_playing_slots(&self, song: &QueueSong, pattern: PatternRef) -> Vec<PatternRef> {
        let Some(data) = song.queue_data(pattern) else {
            return Vec::new();
        };
        let tracks: Vec<usize> = data.track_indices().collect();
        self.play_queue
            .iter()
            .copied()
            .filter(|p| *p != pattern)
            .filter(|p| {
                song.queue_data(*p).is_some_and(|d| {
                    d.state() == QueueState::Play
                        && d.track_indices().any(|t| tracks.contains(&t))
                })
            })
            .collect()
    }

    fn splice_for_all_channels(
        &mut self,
        song: &mut QueueSong,
        pattern: PatternRef,
        start_measure: u32,
    ) {
        let tracks: Vec<usize> = match song.queue_data(pattern) {
            Some(data) => data.track_indices().collect(),
            None => {
                debug_assert!(false, "splice of unknown slot {pattern}");
                return;
            }
        };
        for track_index in tracks {
            self.splice(song, pattern, track_index, start_measure);
        }
    }

    /// Splice one placement, mirror it to the engine, and finalize out any
    /// slot the replacement displaced.
    fn splice(
        &mut self,
        song: &mut QueueSong,
        pattern: PatternRef,
        track_index: usize,
        start_measure: u32,
    ) {
        let (length_measures, loop_enabled) = match song.queue_data(pattern) {
            Some(data) => (
                data.length_measures(),
                match data.channel(track_index) {
                    Some(channel) => channel.is_loop_enabled(),
                    None => {
                        debug_assert!(
                            false,
                            "slot {pattern} has no channel on track {track_index}"
                        );
                        return;
                    }
                },
            ),
            None => {
                debug_assert!(false, "splice of unknown slot {pattern}");
                return;
            }
        };
        let Some(track) = song.track_mut(track_index) else {
            debug_assert!(false, "splice on unknown track {track_index}");
            return;
        };

        let displaced = track.timeline_mut().splice_at(
            start_measure,
            length_measures,
            pattern,
            loop_enabled,
            true,
        );
        log::debug!("splice {pattern} on track {track_index} at measure {start_measure}");

        self.send(EngineCommand::AssignPattern {
            track: track_index,
            start_measure,
            length_measures,
            pattern,
        });
        self.notify(ChangeNotification::TimelineSplice {
            track: track_index,
            measure: start_measure,
            pattern,
        });

        for other in displaced {
            if other == pattern {
                continue;
            }
            if self.pending_promote.contains(&other) {
                // never reached Play; cancel outright
                self.pending_promote.retain(|p| *p != other);
                self.set_state(song, other, QueueState::Idle);
            } else {
                self.stop_playing(song, other);
            }
        }
    }

    /// Take a slot out of the play queue; it settles to `Idle` on the next
    /// start edge.
    fn stop_playing(&mut self, song: &mut QueueSong, pattern: PatternRef) {
        if !self.play_queue.contains(&pattern) {
            return;
        }
        self.play_queue.retain(|p| *p != pattern);
        self.flushed.push(pattern);
        // a displaced (UnQueued) slot keeps that state through the flush
        if song
            .queue_data(pattern)
            .is_some_and(|d| d.state() == QueueState::Play)
        {
            self.set_state(song, pattern, QueueState::PlayUnqueued);
        }
        log::debug!("flush({pattern})");
    }

    fn set_state(&mut self, song: &mut QueueSong, pattern: PatternRef, state: QueueState) {
        let Some(data) = song.queue_data_mut(pattern) else {
            debug_assert!(false, "state change on unknown slot {pattern}");
            return;
        };
        if data.state() == state {
            return;
        }
        data.set_state(state);
        self.notify(ChangeNotification::QueueStateChange { pattern, state });
    }

    pub(crate) fn send(&mut self, command: EngineCommand) {
        if let Err(command) = self.commands.try_push(command) {
            log::warn!("engine command buffer full, dropped {command:?}");
        }
    }

    pub(crate) fn notify(&mut self, event: ChangeNotification) {
        if let Err(event) = self.notifications.try_push(event) {
            log::warn!("notification buffer full, dropped {event:?}");
        }
    }
}

/// Facade owning the song and the player; the crate's public entry point.
///
/// Single-threaded cooperative model: `beat_change` and `touch` must be
/// called from the same thread. Hosts with a separate audio callback thread
/// funnel both through one queue; the engine command and notification
/// channels are the crate's side of that funnel.
pub struct QueueSequencer {
    song: QueueSong,
    player: QueuePlayer,
}

impl QueueSequencer {
    pub fn new(commands: CommandProducer, notifications: NotificationProducer) -> Self {
        Self {
            song: QueueSong::new(),
            player: QueuePlayer::new(commands, notifications),
        }
    }

    /// Rebuild a sequencer from a saved song snapshot.
    ///
    /// Queue states are transient performance state and reset to `Idle`;
    /// timelines and slot authoring come back as saved.
    pub fn from_snapshot(
        mut song: QueueSong,
        commands: CommandProducer,
        notifications: NotificationProducer,
    ) -> Self {
        for slot in song.slots_mut() {
            slot.set_state(QueueState::Idle);
        }
        Self {
            song,
            player: QueuePlayer::new(commands, notifications),
        }
    }

    pub fn song(&self) -> &QueueSong {
        &self.song
    }

    /// Point-in-time deep copy of the song, safe to hold across ticks.
    pub fn snapshot(&self) -> QueueSong {
        self.song.clone()
    }

    pub fn clock(&self) -> &SequencerClock {
        &self.player.clock
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.player.set_audio_enabled(enabled);
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.player.is_audio_enabled()
    }

    //----------------------------------
    // authoring
    //----------------------------------

    /// Create a track and its engine voice channel.
    pub fn add_track(&mut self, index: usize) -> Result<(), SongError> {
        self.song.add_track(index)?;
        self.player.send(EngineCommand::CreateChannel { track: index });
        self.player.notify(ChangeNotification::TrackAdd { track: index });
        Ok(())
    }

    /// Destroy a track and its engine voice channel.
    pub fn remove_track(&mut self, index: usize) -> Result<(), SongError> {
        self.song.remove_track(index)?;
        self.player
            .send(EngineCommand::DestroyChannel { track: index });
        self.player
            .notify(ChangeNotification::TrackRemove { track: index });
        Ok(())
    }

    /// Get or create the slot for `pattern`.
    pub fn add_slot(&mut self, pattern: PatternRef) -> &mut QueueData {
        self.song.add_slot(pattern)
    }

    /// Register `pattern` to play on `track_index`.
    pub fn add_channel(
        &mut self,
        pattern: PatternRef,
        track_index: usize,
    ) -> Result<&mut QueueDataChannel, SongError> {
        self.song.add_channel(pattern, track_index)
    }

    //----------------------------------
    // queries
    //----------------------------------

    pub fn queue_data(&self, bank: u8, pattern: u8) -> Option<&QueueData> {
        self.song.queue_data(PatternRef::new(bank, pattern))
    }

    pub fn channel(
        &self,
        bank: u8,
        pattern: u8,
        track_index: usize,
    ) -> Option<&QueueDataChannel> {
        self.song.channel(PatternRef::new(bank, pattern), track_index)
    }

    /// Per-bank snapshot view for a pad/grid UI: pattern index -> slot.
    pub fn view(&self, bank: u8) -> BTreeMap<u8, &QueueData> {
        self.song.view(bank)
    }

    //----------------------------------
    // transport
    //----------------------------------

    pub fn touch(&mut self, pattern: PatternRef) -> bool {
        self.player.touch(&mut self.song, pattern)
    }

    pub fn play(&mut self) {
        self.player.play(&mut self.song);
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn beat_change(&mut self, measure: i32, beat: f32) {
        self.player.beat_change(&mut self.song, measure, beat);
    }
}
