pub mod client;

pub use client::{parse_server_payload, CallSubjects, NatsConnector, NatsSession};
