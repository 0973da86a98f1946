//! Progress reporting
//!
//! A [`ProgressSink`] observes an exploration through human-readable status
//! lines. Sinks cannot influence the exploration.

/// Receiver of progress messages
pub trait ProgressSink {
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str),
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Sink that forwards every message to the `log` facade at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, message: &str) {
        log::info!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink() {
        let lines = RefCell::new(Vec::new());
        let sink = |message: &str| lines.borrow_mut().push(message.to_string());
        sink.report("one");
        sink.report("two");
        assert_eq!(*lines.borrow(), vec!["one", "two"]);
    }
}
