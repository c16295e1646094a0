use thiserror::Error;

/// Failure taxonomy shared by the core and the effect runners.
///
/// None of these is fatal: each is caught at the boundary of the operation that raised
/// it and turned into a logged no-op or a user-visible notice.
#[derive(Debug, Error)]
pub enum AuraError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("non-ok response: HTTP {status}")]
    NonOkResponse { status: u16 },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("storage fault: {0}")]
    StorageFault(String),

    #[error("host bridge unavailable: {0}")]
    BridgeUnavailable(String),
}

impl AuraError {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NetworkUnreachable(_) => "network-unreachable",
            Self::NonOkResponse { .. } => "non-ok-response",
            Self::MalformedPayload(_) => "malformed-payload",
            Self::StorageFault(_) => "storage-fault",
            Self::BridgeUnavailable(_) => "bridge-unavailable",
        }
    }
}

impl From<std::io::Error> for AuraError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageFault(err.to_string())
    }
}

impl From<serde_json::Error> for AuraError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}
