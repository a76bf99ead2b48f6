//! Load status and the per-page diagnostic record.

use std::sync::Arc;

use runtime::{DiagnosticLog, LogEntry};
use scene::components::Rotation;
use scene::{GeoLocation, NodeKind, SceneHandle, SceneStats};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed { reason: String },
}

impl LoadStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadStatus::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            LoadStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// How the final location was chosen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Positioning {
    Embedded,
    Assigned,
    Skipped,
}

/// Metadata pulled out of a loaded scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: Option<String>,
    pub kind: NodeKind,
    pub bounds_min: Option<[f64; 3]>,
    pub bounds_max: Option<[f64; 3]>,
    /// Width, height, depth in model units.
    pub dimensions: Option<[f64; 3]>,
    pub coordinates: Option<GeoLocation>,
    pub position: [f64; 3],
    pub rotation: Rotation,
    pub scale: [f64; 3],
    pub user_data: Option<Value>,
    pub stats: SceneStats,
    pub generator: Option<String>,
    pub positioning: Option<Positioning>,
    pub location: Option<GeoLocation>,
    pub object_id: Option<u64>,
}

impl ModelInfo {
    pub fn from_scene(scene: &SceneHandle) -> Self {
        Self {
            name: scene.name.clone(),
            kind: scene.kind,
            bounds_min: scene.bounds.map(|b| b.min.as_array()),
            bounds_max: scene.bounds.map(|b| b.max.as_array()),
            dimensions: scene.bounds.map(|b| b.size().as_array()),
            coordinates: scene.embedded.coordinates,
            position: scene.embedded.position.as_array(),
            rotation: scene.embedded.rotation,
            scale: scene.embedded.scale.as_array(),
            user_data: scene.user_data.clone(),
            stats: scene.stats,
            generator: scene.generator.clone(),
            positioning: None,
            location: None,
            object_id: None,
        }
    }
}

/// Outcome of the secondary structural probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Verdict {
    /// Container is sound; blame lies with the importer or the asset's features.
    PayloadValid { summary: Vec<String> },
    PayloadMalformed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadState {
    #[serde(flatten)]
    pub status: LoadStatus,
    pub model: Option<ModelInfo>,
    pub verdict: Option<Verdict>,
    pub timed_out: bool,
    /// The flow has finished, including any follow-up diagnosis.
    pub settled: bool,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            status: LoadStatus::Pending,
            model: None,
            verdict: None,
            timed_out: false,
            settled: false,
        }
    }
}

/// Final state plus the full log, as printed by `probe load --json`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    #[serde(flatten)]
    pub state: LoadState,
    pub log: Vec<LogEntry>,
}

impl LoadReport {
    pub fn status(&self) -> &LoadStatus {
        &self.state.status
    }
}

/// Log plus observable status for one mounted page.
#[derive(Debug, Clone)]
pub struct LoadDiagnostic {
    log: DiagnosticLog,
    state: Arc<watch::Sender<LoadState>>,
}

impl Default for LoadDiagnostic {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadDiagnostic {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadState::default());
        Self {
            log: DiagnosticLog::new(),
            state: Arc::new(tx),
        }
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.state.borrow().status.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut LoadState)) {
        self.state.send_modify(f);
    }

    pub(crate) fn set_status(&self, status: LoadStatus) {
        tracing::info!(?status, "load status");
        self.update(|s| s.status = status);
    }

    /// Resolves once the flow has finished.
    pub async fn wait_settled(&self) -> LoadState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn report(&self) -> LoadReport {
        LoadReport {
            state: self.state(),
            log: self.log.entries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{LoadDiagnostic, LoadStatus};

    #[test]
    fn starts_pending_and_empty() {
        let diag = LoadDiagnostic::new();
        assert_eq!(diag.status(), LoadStatus::Pending);
        assert!(diag.log().is_empty());
        assert!(!diag.state().settled);
    }

    #[test]
    fn status_serializes_flat() {
        let failed = LoadStatus::Failed {
            reason: "HTTP 404: Not Found".into(),
        };
        let json = serde_json::to_value(&failed).expect("json");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 404: Not Found");
        assert_eq!(failed.reason(), Some("HTTP 404: Not Found"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_settled_wakes_on_settle() {
        let diag = LoadDiagnostic::new();
        let other = diag.clone();
        let waiter = tokio::spawn(async move { other.wait_settled().await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        diag.set_status(LoadStatus::Loaded);
        diag.update(|s| s.settled = true);

        let state = waiter.await.expect("join");
        assert_eq!(state.status, LoadStatus::Loaded);
    }
}
