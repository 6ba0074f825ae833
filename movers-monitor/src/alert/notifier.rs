use tracing::info;

/// Title of the short term alert notification.
pub const ALERT_TITLE: &str = "Short-term gain alert";

/// Tag shared by all short term alert notifications, a newer one replaces the older.
pub const ALERT_TAG: &str = "short-term-alert";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, derive_more::Display)]
pub enum NotificationPermission {
    #[display("granted")]
    Granted,
    /// Not decided yet, may be requested.
    #[display("default")]
    Default,
    #[display("denied")]
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    /// Alert the user again even if a notification with the same tag is displayed.
    pub renotify: bool,
}

/// OS level notification surface, only used while the monitor is hidden.
pub trait Notifier: Send {
    fn permission(&self) -> NotificationPermission;

    fn request_permission(&mut self);

    fn display(&mut self, notification: &Notification);
}

/// [`Notifier`] that emits notifications as `tracing` events.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    permission: NotificationPermission,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(NotificationPermission::Granted)
    }
}

impl LogNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) {
        if self.permission == NotificationPermission::Default {
            self.permission = NotificationPermission::Granted;
            info!("notification permission granted");
        }
    }

    fn display(&mut self, notification: &Notification) {
        info!(
            title = %notification.title,
            tag = %notification.tag,
            renotify = notification.renotify,
            "notification\n{}",
            notification.body
        );
    }
}
