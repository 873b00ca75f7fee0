//! Generated `ping.v1` service contract.
//!
//! This crate holds the externally versioned message schemas and stubs for
//! the `PingService`. The schema is consumed as-is; nothing in the harness
//! owns or extends it. Four remote operations are exposed:
//!
//! | Operation | Shape |
//! |-----------|-------|
//! | `Ping` | unary |
//! | `Sum` | client-streaming |
//! | `Generate` | server-streaming |
//! | `Count` | bidirectional-streaming |

/// Generated protobuf modules.
pub mod ping {
    /// Types and stubs for the `ping.v1` package.
    pub mod v1 {
        #![allow(missing_docs, clippy::all, clippy::pedantic)]
        tonic::include_proto!("ping.v1");
    }
}

pub use ping::v1::ping_service_client::PingServiceClient;
pub use ping::v1::ping_service_server::{PingService, PingServiceServer};
pub use ping::v1::{
    CountRequest, CountResponse, GenerateRequest, GenerateResponse, PingRequest, PingResponse,
    SumRequest, SumResponse,
};
