//! Bounded request sequences replayed as lazy streams.
//!
//! Each streaming pattern feeds from a finite in-memory sequence. The
//! sequences are forward-only and not restartable; nothing is produced
//! until the transport polls for the next element.

use futures::Stream;
use pingkit_proto::{CountRequest, SumRequest};

/// The unit contributions submitted over a client-streaming `Sum` call.
pub fn sum_requests(count: usize, addition: i32) -> impl Stream<Item = SumRequest> + Send + 'static {
    tokio_stream::iter(std::iter::repeat(SumRequest { addition }).take(count))
}

/// The unit contributions submitted over the outbound half of a `Count` call.
pub fn count_requests(
    count: usize,
    addition: i32,
) -> impl Stream<Item = CountRequest> + Send + 'static {
    tokio_stream::iter(std::iter::repeat(CountRequest { addition }).take(count))
}
