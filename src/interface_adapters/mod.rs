pub mod clients;
pub mod notifier;
pub mod protocol;
pub mod state;
pub mod storage;

pub use clients::ApiClient;
pub use notifier::TracingNotifier;
pub use state::AppState;
pub use storage::{FileStorage, MemoryStorage};
