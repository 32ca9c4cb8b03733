// Change notifications - Sequencer -> UI and persistence listeners

use crate::sequencer::queue_data::{PatternRef, QueueState};

/// One event per applied state transition or timeline mutation.
///
/// Within a single `beat_change` call, delivery order matches the order the
/// transitions were applied. Listeners treat these as point-in-time facts;
/// the query surface is the place to read current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeNotification {
    /// A slot moved to a new queue state.
    QueueStateChange {
        pattern: PatternRef,
        state: QueueState,
    },
    /// A placement was spliced into a track's timeline.
    TimelineSplice {
        track: usize,
        measure: u32,
        pattern: PatternRef,
    },
    /// A track (and its engine voice channel) was created.
    TrackAdd { track: usize },
    /// A track (and its engine voice channel) was destroyed.
    TrackRemove { track: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_carries_slot_identity() {
        let notif = ChangeNotification::QueueStateChange {
            pattern: PatternRef::new(1, 3),
            state: QueueState::Queue,
        };

        match notif {
            ChangeNotification::QueueStateChange { pattern, state } => {
                assert_eq!(pattern, PatternRef::new(1, 3));
                assert_eq!(state, QueueState::Queue);
            }
            _ => panic!("Expected QueueStateChange"),
        }
    }
}
