//! Integration tests for playlog-remote
//!
//! Uses wiremock to simulate the telemetry service and verifies request
//! shape, headers and the mapping of responses onto the client results.

mod common;

mod test_sessions;
mod test_sync;
