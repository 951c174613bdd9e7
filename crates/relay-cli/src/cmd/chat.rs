use super::Ctx;
use anyhow::Result;
use relay_core::{ChatSink, CommandHandler};

/// Prints outbound chat lines to stdout.
struct StdoutSink;

impl ChatSink for StdoutSink {
    fn send(&self, message: &str) {
        println!("{message}");
    }
}

/// Feed each message to the command handler in turn, letting any plan it
/// starts finish before the next message is read.
pub fn run(ctx: &Ctx, messages: &[String]) -> Result<()> {
    let host = ctx.host()?;
    let handler = CommandHandler::new(host.engine.clone(), StdoutSink);

    for message in messages {
        tracing::debug!(%message, "chat command");
        handler.handle(message);
        host.settle()?;
    }
    Ok(())
}
