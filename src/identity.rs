use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Stable name for a storage destination implementation.
///
/// Identities are what the settings store and the mime-type bindings refer
/// to; they key the [`AdapterRegistry`](crate::AdapterRegistry) and are
/// compared by equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local filesystem storage. Terminal fallback; always constructible.
    Local,
    /// AWS S3.
    AwsS3,
    /// Aliyun OSS.
    Aliyun,
    /// OVH object storage (OpenStack Swift).
    OvhSwift,
    /// Imgur image host.
    Imgur,
}

impl BackendKind {
    /// All known identities, in cascade priority order (local last).
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Aliyun,
        BackendKind::AwsS3,
        BackendKind::OvhSwift,
        BackendKind::Imgur,
        BackendKind::Local,
    ];

    /// The identity string used by the settings store.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::AwsS3 => "aws-s3",
            BackendKind::Aliyun => "aliyun",
            BackendKind::OvhSwift => "ovh-svfs",
            BackendKind::Imgur => "imgur",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendKind::Local),
            "aws-s3" => Ok(BackendKind::AwsS3),
            "aliyun" => Ok(BackendKind::Aliyun),
            "ovh-svfs" => Ok(BackendKind::OvhSwift),
            "imgur" => Ok(BackendKind::Imgur),
            other => Err(Error::Generic(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}
