/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Raised when the live post stream fails.
    pub fn feed_unavailable() -> Self {
        Self::new("Error", "Could not load posts.")
    }
}

/// Surface that shows alerts to the user.
pub trait AlertSink {
    fn alert(&self, alert: Alert);
}

impl<F> AlertSink for F
where
    F: Fn(Alert),
{
    fn alert(&self, alert: Alert) {
        self(alert)
    }
}

/// Sink that writes alerts to the error log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&self, alert: Alert) {
        log::error!("{}: {}", alert.title, alert.message);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn raise(sink: &impl AlertSink) {
        sink.alert(Alert::feed_unavailable());
    }

    #[test]
    fn closures_receive_alerts() {
        let seen = RefCell::new(Vec::new());
        raise(&|alert: Alert| seen.borrow_mut().push(alert));
        assert_eq!(seen.into_inner(), [Alert::new("Error", "Could not load posts.")]);
    }

    #[test]
    fn log_sink_accepts_alerts_without_a_logger() {
        raise(&LogAlerts);
    }
}
