//! Command-line entry point for the pingkit harness.
//!
//! Takes a single positional action name, establishes the encrypted
//! channel, runs the selected exchange inside a span, prints the outcome,
//! and exits non-zero on any failure.

use miette::Result;
use pingkit_client::{
    Action, ChannelConfig, ClientError, OtelConfig, init_tracing, open_channel, run,
};
use tracing::debug;

fn action_argument() -> Result<String, ClientError> {
    let mut args = std::env::args().skip(1);
    let action = args.next().ok_or_else(|| ClientError::Usage {
        message: format!("usage: pingkit <{}>", Action::NAMES.join("|")),
    })?;
    if let Some(extra) = args.next() {
        return Err(ClientError::Usage {
            message: format!("unexpected argument `{extra}`"),
        });
    }
    Ok(action)
}

#[tokio::main]
async fn main() -> Result<()> {
    let action = action_argument()?;
    // Reject unknown actions before any resource is touched.
    action.parse::<Action>()?;

    let guard = init_tracing(OtelConfig::from_env())?;
    let config = ChannelConfig::from_env();
    debug!(endpoint = %config.endpoint, "configuration loaded");

    let outcome = run(&action, &guard.handle(), || open_channel(&config)).await?;
    println!("{outcome}");

    // Flush pending spans before the process exits.
    guard.shutdown();
    Ok(())
}
