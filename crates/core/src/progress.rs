use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Neutral,
    Success,
    Error,
}

/// Transient status line for whoever is watching the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    pub severity: Severity,
}

impl ProgressEvent {
    pub fn neutral(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Neutral,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

pub trait ProgressSink: Send {
    fn notify(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn notify(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Fire-and-forget delivery to at most one subscriber.
#[derive(Default)]
pub struct ProgressReporter {
    sink: Option<Box<dyn ProgressSink>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: impl ProgressSink + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
        }
    }

    /// Install `sink`, returning the one it displaced.
    pub fn subscribe(
        &mut self,
        sink: impl ProgressSink + 'static,
    ) -> Option<Box<dyn ProgressSink>> {
        self.sink.replace(Box::new(sink))
    }

    pub fn unsubscribe(&mut self) -> Option<Box<dyn ProgressSink>> {
        self.sink.take()
    }

    pub fn emit(&mut self, event: ProgressEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.notify(&event);
        }
    }
}
