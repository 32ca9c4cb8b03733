// Engine command types - Communication sequencer -> sound engine

use crate::sequencer::queue_data::PatternRef;

/// Transport mode the engine is started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Loop the currently selected pattern.
    Pattern,
    /// Follow the song sequencer.
    Song,
}

/// Fire-and-forget commands sent to the sound engine.
///
/// No acknowledgment is awaited. The sequencer model is the source of truth
/// for playback state; a command the engine fails to honor is logged by the
/// sender and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Create the voice channel backing a track.
    CreateChannel { track: usize },
    /// Destroy the voice channel backing a track.
    DestroyChannel { track: usize },
    /// Assign a pattern to a measure range of a track in the engine's
    /// song sequencer. Sent once per timeline splice.
    AssignPattern {
        track: usize,
        start_measure: u32,
        length_measures: u32,
        pattern: PatternRef,
    },
    /// Start the transport.
    TransportStart { mode: TransportMode },
    /// Stop the transport.
    TransportStop,
}
