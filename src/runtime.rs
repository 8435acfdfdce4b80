//! Runtime and backend detection

use crate::context::{Backend, ContextId, ExecutionContextResolver};
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    TokioMultiThread,
    TokioCurrentThread,
    /// Plain threads, no async runtime on this thread.
    Blocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Windows,
    Unix,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeInfo {
    pub kind: RuntimeKind,
    pub os: OsFamily,
    pub pid: u32,
    pub context_id: String,
    pub backend: &'static str,
}

/// Whether a tokio runtime is driving the current thread.
pub fn has_tokio() -> bool {
    Handle::try_current().is_ok()
}

pub fn runtime_kind() -> RuntimeKind {
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => RuntimeKind::TokioCurrentThread,
            _ => RuntimeKind::TokioMultiThread,
        },
        Err(_) => RuntimeKind::Blocking,
    }
}

pub fn os_family() -> OsFamily {
    if cfg!(windows) {
        OsFamily::Windows
    } else {
        OsFamily::Unix
    }
}

impl RuntimeInfo {
    pub fn detect() -> Self {
        Self::detect_with(&ExecutionContextResolver::new())
    }

    pub fn detect_with(resolver: &ExecutionContextResolver) -> Self {
        let id: ContextId = resolver.current_id();
        let backend: Backend = id.backend();
        Self {
            kind: runtime_kind(),
            os: os_family(),
            pid: std::process::id(),
            context_id: id.to_string(),
            backend: backend.tag(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_thread_reports_process_context() {
        let info = RuntimeInfo::detect();
        assert_eq!(info.kind, RuntimeKind::Blocking);
        assert_eq!(info.backend, "proc");
        assert_eq!(info.pid, std::process::id());
        assert!(!has_tokio());
    }

    #[tokio::test]
    async fn current_thread_runtime_is_detected() {
        assert!(has_tokio());
        assert_eq!(runtime_kind(), RuntimeKind::TokioCurrentThread);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_thread_runtime_is_detected() {
        assert_eq!(runtime_kind(), RuntimeKind::TokioMultiThread);
        let json = serde_json::to_value(RuntimeInfo::detect()).unwrap();
        assert_eq!(json["kind"], "tokio_multi_thread");
    }
}
