pub mod error;
pub mod events;
pub mod filters;
pub mod manager;
pub mod session;
pub mod task_queue;
pub mod track;
pub mod voice;

pub use error::PlayerError;
pub use events::{EventBus, PlayerEvent};
pub use manager::SessionManager;
pub use session::{PlaybackSession, SessionOptions};
pub use track::{RepeatMode, Track};
