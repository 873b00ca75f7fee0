//! The four call-shape executors plus the no-op control action.
//!
//! Each executor drives one exchange over an already-open channel and
//! terminates: `Idle -> Sending -> (Streaming)* -> Completed | Failed`.
//! Failure is terminal and surfaces as a typed error; nothing is retried.
//! A transport that never comes up is a connection failure, a call the
//! service rejects is an rpc failure, and a sequence that dies after
//! delivery began is a stream failure.

use std::fmt;

use pingkit_proto::{GenerateRequest, PingRequest};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::streams;
use crate::telemetry::TracedStub;

/// Number of requests contributed by each streaming pattern.
pub const STREAM_LEN: usize = 6;

/// Contribution carried by each streaming request.
pub const UNIT_ADDITION: i32 = 1;

/// Seed handed to the server-streaming pattern.
pub const GENERATE_SEED: i32 = 6;

/// What a completed action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The unary round trip completed.
    Pong {
        /// Greeting returned by the service.
        greeting: String,
    },
    /// The client-streaming aggregate arrived.
    Summed {
        /// Aggregate total over all submitted contributions.
        sum: i32,
    },
    /// The server-streaming sequence ran to completion.
    Generated {
        /// Partial sums in service-emission order.
        progress: Vec<i32>,
    },
    /// The bidirectional exchange terminated on both sides.
    Counted {
        /// Running totals in arrival order.
        sums: Vec<i32>,
    },
    /// The no-op control action; no RPC was issued.
    NoOp,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pong { greeting } => write!(f, "server responded: {greeting}"),
            Self::Summed { sum } => write!(f, "received sum: {sum}"),
            Self::Generated { progress } => match progress.last() {
                Some(last) => write!(
                    f,
                    "received {} incremental sums, final {last}",
                    progress.len()
                ),
                None => write!(f, "received no incremental sums"),
            },
            Self::Counted { sums } => match sums.last() {
                Some(last) => write!(f, "received {} running totals, final {last}", sums.len()),
                None => write!(f, "received no running totals"),
            },
            Self::NoOp => write!(f, "no rpc issued"),
        }
    }
}

/// Unary: one request, one response, nothing else.
pub async fn ping(stub: &mut TracedStub) -> Result<ActionOutcome, ClientError> {
    let response = stub.ping(PingRequest {}).await?.into_inner();
    info!(greeting = %response.greeting, "ping acknowledged");
    Ok(ActionOutcome::Pong {
        greeting: response.greeting,
    })
}

/// Client-streaming: submit the bounded request sequence, then await the
/// single aggregate.
///
/// Submission does not block per message; the only suspension point is the
/// aggregate await. Dropping the un-awaited call future releases the
/// underlying stream. If the stream closes early the service aggregates
/// whatever it received; that narrowing is part of the contract.
pub async fn sum(stub: &mut TracedStub) -> Result<ActionOutcome, ClientError> {
    let requests = streams::sum_requests(STREAM_LEN, UNIT_ADDITION);
    let response = stub.sum(requests).await?.into_inner();
    info!(sum = response.sum, "aggregate received");
    Ok(ActionOutcome::Summed { sum: response.sum })
}

/// Server-streaming: one seed request, then lazy one-at-a-time consumption
/// until the service closes the stream.
///
/// The sequence is finite, forward-only, and not restartable; consumption
/// suspends between elements.
pub async fn generate(stub: &mut TracedStub) -> Result<ActionOutcome, ClientError> {
    let request = GenerateRequest {
        addition: GENERATE_SEED,
    };
    let mut inbound = stub.generate(request).await?.into_inner();

    let mut progress = Vec::new();
    while let Some(update) = inbound.message().await.map_err(ClientError::stream)? {
        info!(progress = update.progress, "incremental sum received");
        progress.push(update.progress);
    }
    Ok(ActionOutcome::Generated { progress })
}

/// Bidirectional-streaming: independently progressing outbound and inbound
/// sequences over one call.
///
/// The outbound half feeds from its own task so neither direction blocks
/// the other. The service decides response-per-request pairing; the call
/// ends when the outbound sequence is exhausted and the service has closed
/// the inbound one.
pub async fn count(stub: &mut TracedStub) -> Result<ActionOutcome, ClientError> {
    let (tx, rx) = mpsc::channel(STREAM_LEN);
    let feeder = tokio::spawn(async move {
        let mut requests = streams::count_requests(STREAM_LEN, UNIT_ADDITION);
        while let Some(request) = requests.next().await {
            if tx.send(request).await.is_err() {
                debug!("outbound stream dropped before exhaustion");
                break;
            }
        }
    });

    let mut inbound = stub.count(ReceiverStream::new(rx)).await?.into_inner();

    let mut sums = Vec::new();
    while let Some(response) = inbound.message().await.map_err(ClientError::stream)? {
        info!(sum = response.sum, "running total received");
        sums.push(response.sum);
    }

    let _ = feeder.await;
    Ok(ActionOutcome::Counted { sums })
}

/// Degenerate control action: traced like the others but issues no RPC.
///
/// Exercises the dispatch and span path without network interaction. It is
/// not a failure simulation and always succeeds.
pub async fn hardfail() -> Result<ActionOutcome, ClientError> {
    debug!("no-op action, nothing sent");
    Ok(ActionOutcome::NoOp)
}
