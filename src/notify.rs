//! User-facing side effects of the request pipeline.
//!
//! The pipeline never prints or navigates by itself. It reports through a
//! [`Notifier`] (transient messages) and a [`Navigator`] (sending the user to
//! the login entry point), which the front end supplies.

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    fn icon(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "[OK]",
            NoticeLevel::Info => "[--]",
            NoticeLevel::Error => "[!!]",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }
}

pub trait Navigator: Send + Sync {
    /// Leave whatever the user was doing and go to the login entry point.
    fn redirect_to_login(&self);
}

/// Prints notices to stderr so they do not mix with table output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        eprintln!("{} {}", level.icon(), message);
    }
}

/// The CLI's login entry point is the `login` subcommand, so "navigating"
/// there means telling the user to run it.
#[derive(Debug, Clone)]
pub struct ConsoleNavigator {
    login_command: String,
}

impl ConsoleNavigator {
    pub fn new(login_command: impl Into<String>) -> Self {
        Self {
            login_command: login_command.into(),
        }
    }
}

impl Default for ConsoleNavigator {
    fn default() -> Self {
        Self::new("vortexia login")
    }
}

impl Navigator for ConsoleNavigator {
    fn redirect_to_login(&self) {
        tracing::debug!("Redirecting to login");
        eprintln!("Run '{}' to sign in again.", self.login_command);
    }
}

/// Discards everything; for library callers that surface errors themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, level: NoticeLevel, message: &str) {
        tracing::debug!(?level, message, "Notice suppressed");
    }
}

impl Navigator for Silent {
    fn redirect_to_login(&self) {
        tracing::debug!("Login redirect suppressed");
    }
}
