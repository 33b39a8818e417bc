//! Data Transfer Objects for API requests and responses.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::{AllocationRequest, AllocationResult};
use crate::error::ResultCode;

/// Request body of `POST /v1/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Sequence name.
    #[serde(default)]
    pub sequence: String,

    /// Correlation token, base64 encoded on the wire.
    #[serde(default, with = "base64_bytes")]
    pub oid: Bytes,
}

impl From<GenerateRequest> for AllocationRequest {
    fn from(request: GenerateRequest) -> Self {
        Self::new(request.sequence, request.oid)
    }
}

/// Reply body of `POST /v1/generate`.
///
/// `id` and `oid` are only meaningful when `code` is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateReply {
    /// Result code (0 = success).
    pub code: ResultCode,

    /// Allocated id.
    #[serde(default)]
    pub id: u64,

    /// Echo of the request token, base64 encoded on the wire.
    #[serde(default, with = "base64_bytes")]
    pub oid: Bytes,
}

impl GenerateReply {
    /// A failed reply carrying only its code.
    #[must_use]
    pub const fn failure(code: ResultCode) -> Self {
        Self {
            code,
            id: 0,
            oid: Bytes::new(),
        }
    }
}

impl From<AllocationResult> for GenerateReply {
    fn from(result: AllocationResult) -> Self {
        match result {
            Ok(allocation) => Self {
                code: ResultCode::Success,
                id: allocation.id,
                oid: allocation.token,
            },
            Err(err) => Self::failure(err.code()),
        }
    }
}

/// Response of `GET /v1/sequences`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceListResponse {
    /// Configured sequence names, sorted.
    pub sequences: Vec<String>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
