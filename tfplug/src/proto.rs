//! Generated types for Terraform plugin protocol v6
//!
//! Several generated messages share names with framework types
//! (`DynamicValue`, `Diagnostic`, `Schema`), so refer to them through the
//! `proto::` prefix.

tonic::include_proto!("tfplugin6");

pub use provider_server::{Provider as ProviderService, ProviderServer};
