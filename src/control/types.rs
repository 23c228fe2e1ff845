//! Request and response bodies of the control surface

use serde::{Deserialize, Serialize};

/// Body of an add-identity request
///
/// `ip` is accepted as an alias of `address`; the protocol defaults to
/// `http`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddIdentityRequest {
    #[serde(default, alias = "ip")]
    pub address: String,

    #[serde(default)]
    pub protocol: Option<String>,
}

impl AddIdentityRequest {
    pub fn new(address: impl Into<String>, protocol: Option<&str>) -> Self {
        Self {
            address: address.into(),
            protocol: protocol.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddResponse {
    pub added: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
}
