use serde::{Serialize, Deserialize};
use serde_json::Value;

/// One call: method name + single argument. Matches the generic
/// method-plus-one-param RPC convention both proxy pairs speak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
    pub id: u64,
}

/// One reply: either a result or an error string, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<String>,
    pub id: u64,
}

impl RpcResponse {
    pub fn result(id: u64, value: Value) -> Self {
        Self { result: Some(value), error: None, id }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self { result: None, error: Some(message.into()), id }
    }
}
