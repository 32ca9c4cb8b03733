// Lock-free SPSC channels between the sequencer, the engine and listeners

use crate::messaging::command::EngineCommand;
use crate::messaging::notification::ChangeNotification;
use ringbuf::{HeapRb, traits::Split};

pub type CommandProducer = ringbuf::HeapProd<EngineCommand>;
pub type CommandConsumer = ringbuf::HeapCons<EngineCommand>;

/// Bounded channel carrying commands to the sound engine.
pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<EngineCommand>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<ChangeNotification>;
pub type NotificationConsumer = ringbuf::HeapCons<ChangeNotification>;

/// Bounded channel carrying change notifications to external listeners.
pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<ChangeNotification>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_command_channel_fifo() {
        let (mut tx, mut rx) = create_command_channel(4);

        tx.try_push(EngineCommand::CreateChannel { track: 0 }).unwrap();
        tx.try_push(EngineCommand::TransportStop).unwrap();

        assert_eq!(rx.try_pop(), Some(EngineCommand::CreateChannel { track: 0 }));
        assert_eq!(rx.try_pop(), Some(EngineCommand::TransportStop));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_channel_bounded() {
        let (mut tx, _rx) = create_command_channel(1);

        assert!(tx.try_push(EngineCommand::TransportStop).is_ok());
        // full buffer hands the command back instead of growing
        assert!(tx.try_push(EngineCommand::TransportStop).is_err());
    }
}
