//! Observability setup for Kindred: structured logging through
//! `tracing-subscriber`, optionally bridged to OpenTelemetry.

pub mod tracing_setup;
