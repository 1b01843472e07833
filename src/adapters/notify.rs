use crate::ports::{Notification, NotificationKind, NotificationSink};

/// Prints notifications to stderr and mirrors them into the log.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => {
                tracing::error!("{}", notification.message);
                eprintln!("❌ {}", notification.message);
            }
            NotificationKind::Success => {
                tracing::info!("{}", notification.message);
                eprintln!("✅ {}", notification.message);
            }
            NotificationKind::Info => {
                tracing::info!("{}", notification.message);
                eprintln!("💡 {}", notification.message);
            }
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[cfg(test)]
impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}
