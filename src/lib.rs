// groovequeue - Live pattern queueing and playback sequencer
// Queues pattern activations and swaps them onto tracks at measure
// boundaries, driven by the sound engine's beat callback.

pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use messaging::channels::{
    CommandConsumer, CommandProducer, NotificationConsumer, NotificationProducer,
    create_command_channel, create_notification_channel,
};
pub use messaging::command::{EngineCommand, TransportMode};
pub use messaging::notification::ChangeNotification;
pub use sequencer::{
    BEATS_PER_MEASURE, ClockEdges, LOCK_BEAT, PatternPlacement, PatternRef, QueueData,
    QueueDataChannel, QueuePlayer, QueueSequencer, QueueSong, QueueState, SequencerClock,
    SongError, Track, TrackTimeline,
};
