//! Reporting channel for failures the user should see.

use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

use lockerbox_api::Failure;

/// A failure reported to the user, with the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// What was being attempted, e.g. "Failed to load files".
    pub context: String,
    pub failure: Failure,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.failure)
    }
}

/// Receiving half of the reporting channel, drained by the presentation layer.
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Sending half of the reporting channel.
///
/// Cloned into every controller. Reports never block and are dropped
/// silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    /// Create a connected notifier and receiver.
    pub fn channel() -> (Self, NoticeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report `failure` under `context`.
    pub fn report(&self, context: impl Into<String>, failure: Failure) {
        let notice = Notice {
            context: context.into(),
            failure,
        };
        warn!("{}", notice);
        let _ = self.tx.send(notice);
    }

    /// Report `failure` unless it signals an absent or expired session.
    ///
    /// Returns whether a notice was emitted.
    pub fn report_unless_auth(&self, context: impl Into<String>, failure: Failure) -> bool {
        if failure.is_auth_required() {
            return false;
        }
        self.report(context, failure);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        let notice = Notice {
            context: "Failed to load files".to_string(),
            failure: Failure::from_status(404, "specified file/directory does not exist"),
        };
        assert_eq!(
            notice.to_string(),
            "Failed to load files: (404) Specified file/directory does not exist"
        );

        let notice = Notice {
            context: "Failed to load files".to_string(),
            failure: Failure::transport("failed to send request"),
        };
        assert_eq!(notice.to_string(), "Failed to load files: Failed to send request");
    }

    #[test]
    fn test_auth_failures_are_suppressed() {
        let (notifier, mut rx) = Notifier::channel();
        assert!(!notifier.report_unless_auth("ctx", Failure::from_status(401, "no session present")));
        assert!(notifier.report_unless_auth("ctx", Failure::from_status(500, "boom")));

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.failure.status(), Some(500));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_report_after_receiver_dropped() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.report("ctx", Failure::transport("gone"));
    }
}
