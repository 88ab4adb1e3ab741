// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group served by the Publisher and Consumer CRDs
pub const API_GROUP: &str = "secretshare.io";

/// API version served by the Publisher and Consumer CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Kubernetes annotation keys written by the operator
pub mod annotations {
    /// Records `<namespace>/<name>` of the Consumer a copy was generated for
    pub const GENERATED_FROM: &str = "secretshare.io/generated-from";
}

/// The operator name used as field manager
pub const OPERATOR_NAME: &str = "secret-share";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Status write retry configuration
pub mod status {
    /// Attempts for a status write before it is logged and dropped
    pub const WRITE_ATTEMPTS: u32 = 3;
    /// Delay before the first retry of a failed status write
    pub const RETRY_BASE_DELAY_MS: u64 = 100;
}
