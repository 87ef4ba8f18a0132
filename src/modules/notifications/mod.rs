pub mod dispatcher;

pub use dispatcher::{LogDispatcher, NotificationDispatcher, NotificationKind};
