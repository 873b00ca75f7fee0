//! Action selection and single-shot dispatch.
//!
//! The dispatcher is the only owner of the channel for an invocation: it
//! validates the action name, acquires the channel, runs the matching
//! executor exactly once inside a span named after the action, and
//! releases the channel on every exit path. Unknown actions are rejected
//! before the channel-opening closure is ever invoked.

use std::future::Future;
use std::str::FromStr;

use crate::actions::{self, ActionOutcome};
use crate::channel::SecureChannel;
use crate::error::ClientError;
use crate::telemetry::{TracerHandle, bind_stub};

/// The five actions the harness can exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Unary round trip.
    Ping,
    /// Client-streaming aggregate.
    Sum,
    /// Server-streaming tick sequence.
    Generate,
    /// Bidirectional exchange.
    Count,
    /// No-op control action.
    HardFail,
}

impl Action {
    /// Every action name accepted on the command line.
    pub const NAMES: [&'static str; 5] = ["ping", "sum", "generate", "count", "hardfail"];

    /// The name this action answers to, also used as its span name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Sum => "sum",
            Self::Generate => "generate",
            Self::Count => "count",
            Self::HardFail => "hardfail",
        }
    }
}

impl FromStr for Action {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(Self::Ping),
            "sum" => Ok(Self::Sum),
            "generate" => Ok(Self::Generate),
            "count" => Ok(Self::Count),
            "hardfail" => Ok(Self::HardFail),
            other => Err(ClientError::unknown_action(other)),
        }
    }
}

/// Validate `name`, acquire a channel, and run the matching executor once.
///
/// The channel-opening closure is not invoked for unknown names; the
/// acquired channel is owned by this call and released when it returns,
/// whether the executor succeeded or failed.
pub async fn run<F, Fut>(
    name: &str,
    tracer: &TracerHandle,
    open: F,
) -> Result<ActionOutcome, ClientError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<SecureChannel, ClientError>>,
{
    let action = name.parse::<Action>()?;
    let channel = open().await?;
    dispatch(action, tracer, &channel).await
}

/// Run one already-validated action over an open channel.
pub async fn dispatch(
    action: Action,
    tracer: &TracerHandle,
    channel: &SecureChannel,
) -> Result<ActionOutcome, ClientError> {
    let mut stub = bind_stub(channel.channel());
    tracer
        .in_span(action.name(), async move {
            match action {
                Action::Ping => actions::ping(&mut stub).await,
                Action::Sum => actions::sum(&mut stub).await,
                Action::Generate => actions::generate(&mut stub).await,
                Action::Count => actions::count(&mut stub).await,
                Action::HardFail => actions::hardfail().await,
            }
        })
        .await
}
