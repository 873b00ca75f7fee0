//! Core library for the pingkit harness.
//!
//! Exercises the four canonical gRPC call shapes against a
//! `ping.v1.PingService` over an encrypted channel, with each exchange
//! wrapped in a distributed-tracing span:
//!
//! - **unary** `ping`: one request, one response
//! - **client-streaming** `sum`: six contributions, one aggregate
//! - **server-streaming** `generate`: one seed, a sequence of partial sums
//! - **bidirectional-streaming** `count`: independent request and
//!   response sequences over one call
//! - `hardfail`: the traced no-op control action
//!
//! Each invocation runs exactly one action and terminates; there is no
//! retry, no pooling, and no client-side timeout.
//!
//! # Example
//!
//! ```no_run
//! use pingkit_client::{ChannelConfig, TracingGuard, open_channel, run};
//!
//! # async fn example() -> Result<(), pingkit_client::ClientError> {
//! let guard = TracingGuard::disabled();
//! let config = ChannelConfig::default();
//! let outcome = run("ping", &guard.handle(), || open_channel(&config)).await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod actions;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod streams;
pub mod telemetry;

pub use actions::{ActionOutcome, GENERATE_SEED, STREAM_LEN, UNIT_ADDITION};
pub use channel::{ChannelConfig, SecureChannel, open_channel};
pub use dispatch::{Action, dispatch, run};
pub use error::ClientError;
pub use telemetry::{
    OtelConfig, TracedStub, TracerHandle, TracingGuard, bind_stub, init_tracing,
};
