//! Environment diagnostics.
//!
//! Printed as the first block of the demo so a run can be matched to the
//! machine and the backends it used.

use serde::Serialize;
use std::num::NonZeroUsize;
use std::thread;

/// Compute device used for embeddings. fastembed runs on the ONNX Runtime
/// CPU provider.
pub const EMBEDDING_DEVICE: &str = "cpu";

/// Snapshot of the runtime environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentReport {
    /// Crate version.
    pub version: String,
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Threads available to the process.
    pub cpu_threads: usize,
    /// Device the embeddings are computed on.
    pub device: String,
    /// Compiled-in embedding backend.
    pub embedding_backend: String,
    /// Compiled-in vector index backend.
    pub vector_backend: String,
}

impl EnvironmentReport {
    /// Inspects the current process.
    #[must_use]
    pub fn detect() -> Self {
        let cpu_threads = thread::available_parallelism().map_or(1, NonZeroUsize::get);

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_threads,
            device: EMBEDDING_DEVICE.to_string(),
            embedding_backend: crate::embedding::backend_name().to_string(),
            vector_backend: crate::search::backend_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let report = EnvironmentReport::detect();
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
        assert!(report.cpu_threads >= 1);
        assert_eq!(report.device, "cpu");
        assert!(!report.os.is_empty());
        assert!(["fastembed", "hash-fallback"].contains(&report.embedding_backend.as_str()));
        assert!(["flat", "usearch-hnsw"].contains(&report.vector_backend.as_str()));
    }

    #[test]
    fn test_serializes() {
        let json = serde_json::to_value(EnvironmentReport::detect()).unwrap();
        assert!(json.get("cpu_threads").is_some());
        assert_eq!(json["device"], "cpu");
    }
}
