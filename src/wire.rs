use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a [Value],
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: "1.0",
            id,
            method,
            params,
        }
    }
}

/// Raw JSON-RPC response payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(default)]
    pub id: Value,
}

impl Envelope {
    /// Successful envelope carrying `result`.
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            error: None,
            id: Value::Null,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
