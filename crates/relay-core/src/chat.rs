use tracing::warn;

/// Outbound plain-text channel (game chat, a terminal, a test buffer).
pub trait ChatSink: Send + Sync {
    fn send(&self, message: &str);
}

/// Wraps a [`ChatSink`] and drops blank messages before they reach it.
pub struct ChatSender<S> {
    sink: S,
}

impl<S: ChatSink> ChatSender<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns `false` if the message was blank and not sent.
    pub fn send(&self, message: &str) -> bool {
        if message.trim().is_empty() {
            warn!("attempted to send an empty or whitespace message to chat");
            return false;
        }
        self.sink.send(message);
        true
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// A sink that keeps every message, for tests and the CLI.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }
}

impl ChatSink for BufferSink {
    fn send(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_messages_are_dropped() {
        let chat = ChatSender::new(BufferSink::default());
        assert!(!chat.send(""));
        assert!(!chat.send("   \t"));
        assert!(chat.send("hello"));
        assert_eq!(chat.sink().take(), vec!["hello".to_string()]);
        assert!(chat.sink().take().is_empty());
    }
}
