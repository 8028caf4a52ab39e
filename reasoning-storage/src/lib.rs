//! reasoning-storage - durable persistence, tenant config, the trace sink,
//! and HTTP clients for the graph's ontology/data collaborators.
//!
//! `reasoning-graph` is the pure state machine; this crate is everything it
//! talks to over the network or the database (§10.1): `ReasoningRepository`
//! for sessions/turns/tasks/context/clarifications, the Tenant Config
//! Resolver (§4.7), the Trace Sink (§4.4), the tenant/system runtime config
//! cache (§10.5), and [`mcp_client::HttpGraphToolAgent`] /
//! [`mcp_client::HttpDataServiceClient`].

mod mcp_client;
mod pool;
mod repository;
mod runtime_config;
mod tenant_config;
mod trace_sink;

pub use mcp_client::{HttpDataServiceClient, HttpGraphToolAgent};
pub use pool::build_pool;
pub use repository::{ReasoningRepository, RepositoryTaskRecorder};
pub use runtime_config::{RuntimeConfigCache, DEFAULT_AUDIT_PAYLOAD_MAX_CHARS};
pub use tenant_config::{TenantConfigResolver, TenantLlmConfigUpdate, TenantLlmConfigView};
pub use trace_sink::TraceSink;
