// Messaging - typed channels between the sequencer, the engine and listeners

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{create_command_channel, create_notification_channel};
pub use command::{EngineCommand, TransportMode};
pub use notification::ChangeNotification;
