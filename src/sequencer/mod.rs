// Sequencer module - live queue scheduling over the engine beat callback
// Clock, timelines, slot state machine and the queue player

pub mod clock;
pub mod player;
pub mod queue_data;
pub mod song;
pub mod timeline;

pub use clock::{BEATS_PER_MEASURE, ClockEdges, LOCK_BEAT, SequencerClock};
pub use player::{QueuePlayer, QueueSequencer};
pub use queue_data::{PatternRef, QueueData, QueueDataChannel, QueueState};
pub use song::{QueueSong, SongError, Track};
pub use timeline::{PatternPlacement, TrackTimeline};
