use serde::{Deserialize, Serialize};

/// etcd error code: key not found
pub const ERROR_KEY_NOT_FOUND: u32 = 100;
/// etcd error code: compare failed (prevIndex/prevValue mismatch)
pub const ERROR_TEST_FAILED: u32 = 101;
/// etcd error code: key already exists (prevExist=false)
pub const ERROR_NODE_EXIST: u32 = 105;

/// Response envelope of the v2 keys API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    /// Operation that produced the response (`get`, `set`, `compareAndSwap`, ...)
    pub action: String,
    /// Node after the operation
    pub node: Node,
    /// Node before a write, when it existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_node: Option<Node>,
}

/// A key or directory node; directories carry their children in `nodes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Full key path
    #[serde(default)]
    pub key: String,
    /// Value of a key node; absent on directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub dir: bool,
    /// Children of a directory node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// Index of the last modification
    #[serde(default)]
    pub modified_index: u64,
    /// Index the node was created at
    #[serde(default)]
    pub created_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// etcd error code, e.g. [`ERROR_KEY_NOT_FOUND`]
    pub error_code: u32,
    #[serde(default)]
    pub message: String,
    /// Key or condition the error concerns
    #[serde(default)]
    pub cause: Option<String>,
    /// Store index when the error occurred
    #[serde(default)]
    pub index: u64,
}

/// One member of the store cluster as listed by the peer admin API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMachine {
    /// Member name, usually the host name
    pub name: String,
    /// Raft state, e.g. `leader` or `follower`
    pub state: String,
    /// Client API URL
    #[serde(rename = "clientURL")]
    pub client_url: String,
    /// Raft peer URL
    #[serde(rename = "peerURL")]
    pub peer_url: String,
}
