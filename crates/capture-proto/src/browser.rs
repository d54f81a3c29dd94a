use serde::{Deserialize, Serialize};

/// A tab discovered on a browser's debug endpoint (spec.md §4.5, §6).
///
/// Not cached beyond a single operation — tabs open and close too quickly
/// for a descriptor to remain trustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTab {
    pub id: String,
    pub title: String,
    pub url: String,
    /// WebSocket URL for the tab's devtools RPC endpoint.
    pub rpc_endpoint: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl BrowserTab {
    /// Only entries whose `type` is `"page"` are real capturable tabs
    /// (spec.md §4.5: "keep only entries whose type is page").
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// A running browser process advertising a debug port.
///
/// May be cached briefly by the caller; invalidated the next time
/// discovery fails to observe the same process (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInstance {
    pub process_id: u32,
    pub debug_port: u16,
    pub profile_path: String,
    pub version: String,
    pub user_agent: String,
}
