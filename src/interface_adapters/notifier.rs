use crate::domain::ports::Notifier;

// Emits notifications as tracing events; the CLI's subscriber prints them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "notify", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "notify", "{message}");
    }
}
