//! `bitcoind-rpc-retry` is an async JSON-RPC client for bitcoind and compatible
//! daemons with per-attempt timeouts and bounded retry.
//!
//! Every declared remote method goes through the same decorator:
//! - the call is raced against [`ClientOptions::timeout_ms`];
//! - failures are retried up to [`ClientOptions::max_retries`] times with a
//!   fixed [`ClientOptions::retry_delay_ms`] between attempts;
//! - the final failure is returned as [`RpcClientError::Call`].
//!
//! Methods can be called by name through [`RpcClient::call`] (declared casing
//! or lowercase) or through the generated methods such as
//! [`RpcClient::get_block_count`].

mod callspec;
mod client;
mod connection;
mod error;
mod options;
mod params;
mod retry;
mod transport;
mod wire;

pub use callspec::{ArgKind, MethodSpec, CALLSPEC};
pub use client::RpcClient;
pub use connection::{ConnectionParams, DEFAULT_PORT};
pub use error::{CallFailure, ConfigurationError, RpcClientError};
#[cfg(feature = "tracing")]
pub use options::TracingLogger;
pub use options::{ClientOptions, OptionOverrides, RetryLogger};
pub use params::Params;
pub use transport::{CallbackTransport, Completion, HttpTransport, Transport};
pub use wire::{Envelope, RemoteError};

pub use serde_json::Value;

pub type Result<T> = std::result::Result<T, RpcClientError>;
