pub mod channel;
pub mod handler;
pub mod listener;
pub mod types;

pub use channel::{BroadcastPushChannel, EventStream, PushChannel};
pub use handler::{end_session, ingest_event, notification_stream};
pub use listener::{EventSourceListener, ListenerSender};
pub use types::{ListenerEvent, RemoteInsertEvent};
