//! Asset load & diagnose flow.
//!
//! fetch -> primary import (under a timeout) -> place and register with the
//! overlay. Parse failures hand the payload to the structural probe, whose
//! verdict is logged but never changes the status or the overlay.

use std::sync::Arc;

use formats::{
    AssetFormat, AssetPayload, AssetRequest, PrimaryParser, StructuralProbe, StructureReport,
};
use layers::{Overlay, OverlayObject};
use runtime::DiagnosticLog;
use scene::{ResolvedLocation, SceneHandle};
use streaming::{AssetFetcher, FetchedAsset};

use crate::config::LoaderSettings;
use crate::error::LoadFailure;
use crate::status::{LoadDiagnostic, LoadReport, LoadStatus, ModelInfo, Positioning, Verdict};

fn fmt_coords(c: [f64; 3]) -> String {
    format!("[{}, {}, {}]", c[0], c[1], c[2])
}

pub struct AssetLoadFlow {
    fetcher: Arc<dyn AssetFetcher>,
    primary: Arc<dyn PrimaryParser>,
    probe: Arc<dyn StructuralProbe>,
    settings: LoaderSettings,
}

impl std::fmt::Debug for AssetLoadFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoadFlow")
            .field("primary", &self.primary.name())
            .field("probe", &self.probe.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl AssetLoadFlow {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        primary: Arc<dyn PrimaryParser>,
        probe: Arc<dyn StructuralProbe>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            fetcher,
            primary,
            probe,
            settings,
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Runs one load to completion and returns the final state and log.
    pub async fn run(
        &self,
        request: &AssetRequest,
        overlay: &dyn Overlay,
        diag: &LoadDiagnostic,
    ) -> LoadReport {
        let log = diag.log();
        let format = request.asset.format();
        log.info(format!("Loading {} model...", format.describe()));
        log.info(format!("File path: {}", request.asset.locator()));

        if let Err(failure) = self.load(request, overlay, diag).await {
            log.error(failure.to_string());
            diag.set_status(LoadStatus::Failed {
                reason: failure.to_string(),
            });
        }

        diag.update(|s| s.settled = true);
        diag.report()
    }

    async fn load(
        &self,
        request: &AssetRequest,
        overlay: &dyn Overlay,
        diag: &LoadDiagnostic,
    ) -> Result<(), LoadFailure> {
        request.validate()?;
        let log = diag.log();
        let format = request.asset.format();
        let payload = self.fetch_payload(request, log).await?;

        let timeout = self.settings.parse_timeout();
        log.info(format!(
            "Starting {} import (timeout {} s)...",
            self.primary.name(),
            timeout.as_secs()
        ));
        let parsed = tokio::time::timeout(timeout, self.primary.load(format, payload.clone())).await;

        let scene = match parsed {
            Ok(Ok(Some(scene))) => scene,
            Ok(Ok(None)) => {
                log.warn("Importer finished but produced no scene");
                log.info("The file loads but cannot be parsed into a scene");
                let failure = LoadFailure::ParseAmbiguous;
                diag.set_status(LoadStatus::Failed {
                    reason: failure.to_string(),
                });
                self.follow_up(format, &payload, diag, true).await;
                return Ok(());
            }
            Ok(Err(err)) => {
                let failure = LoadFailure::ParseRejected(err.to_string());
                log.error(failure.to_string());
                diag.set_status(LoadStatus::Failed {
                    reason: failure.to_string(),
                });
                self.follow_up(format, &payload, diag, true).await;
                return Ok(());
            }
            Err(_elapsed) => {
                // The importer future is dropped here; the status stays pending.
                diag.update(|s| s.timed_out = true);
                let failure = LoadFailure::ParseTimeout {
                    secs: timeout.as_secs(),
                };
                log.warn(format!("TIMEOUT: {} {failure}", self.primary.name()));
                log.info("This suggests a parsing error or compatibility issue with the asset");
                self.follow_up(format, &payload, diag, false).await;
                return Ok(());
            }
        };

        self.place(request, scene, overlay, diag)
    }

    async fn fetch_payload(
        &self,
        request: &AssetRequest,
        log: &DiagnosticLog,
    ) -> Result<AssetPayload, LoadFailure> {
        let fetched = self.fetch_logged(request.asset.locator(), log).await?;
        log.success(format!(
            "File loaded successfully, size: {} bytes",
            fetched.byte_len()
        ));
        log.info(format!("BLAKE3: {}", fetched.digest_hex()));
        let mut payload = AssetPayload::new(fetched.body);

        if let Some(mtl) = request.asset.material_library() {
            log.info(format!("Material library: {mtl}"));
            match self.fetch_logged(mtl, log).await {
                Ok(materials) => {
                    log.success(format!(
                        "Material library loaded, size: {} bytes",
                        materials.byte_len()
                    ));
                    payload = payload.with_materials(materials.body);
                }
                Err(e) => {
                    log.warn(format!(
                        "Material library unavailable ({e}), continuing without materials"
                    ));
                }
            };
        }
        Ok(payload)
    }

    async fn fetch_logged(
        &self,
        locator: &streaming::Locator,
        log: &DiagnosticLog,
    ) -> Result<FetchedAsset, LoadFailure> {
        let fetched = self
            .fetcher
            .fetch(locator)
            .await
            .map_err(|e| LoadFailure::Network(e.to_string()))?;
        log.info(format!(
            "File fetch status: {} {}",
            fetched.status, fetched.reason
        ));
        log.info(format!(
            "File size: {} bytes",
            fetched
                .content_length
                .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
        ));
        log.info(format!(
            "Content type: {}",
            fetched.content_type.as_deref().unwrap_or("unknown")
        ));
        if !fetched.is_success() {
            return Err(LoadFailure::Http {
                status: fetched.status,
                reason: fetched.reason,
            });
        }
        Ok(fetched)
    }

    fn place(
        &self,
        request: &AssetRequest,
        scene: SceneHandle,
        overlay: &dyn Overlay,
        diag: &LoadDiagnostic,
    ) -> Result<(), LoadFailure> {
        let log = diag.log();
        log.success(format!("{} import succeeded, model loaded", self.primary.name()));

        if !scene.embedded.is_finite() || scene.bounds.is_some_and(|b| !b.is_finite()) {
            return Err(LoadFailure::ParseException(
                "model metadata contains non-finite values".into(),
            ));
        }

        let mut info = ModelInfo::from_scene(&scene);
        log.info(format!("Model type: {}", scene.kind.as_str()));
        log.info(format!(
            "Model name: {}",
            scene.name.as_deref().unwrap_or("Unnamed")
        ));
        match scene.embedded.coordinates {
            Some(c) => log.info(format!("Model has coordinates: {}", fmt_coords(c.as_array()))),
            None if scene.roots.len() == 1 => log.info(format!(
                "Model has position: {}",
                fmt_coords(scene.embedded.position.as_array())
            )),
            None => log.warn("No positioning metadata found in model"),
        };
        match scene.bounds {
            Some(bb) => {
                let size = bb.size();
                log.info(format!(
                    "Bounding box: min({:.2}, {:.2}, {:.2}) max({:.2}, {:.2}, {:.2})",
                    bb.min.x, bb.min.y, bb.min.z, bb.max.x, bb.max.y, bb.max.z
                ));
                log.info(format!(
                    "Model dimensions: {:.2}m x {:.2}m x {:.2}m",
                    size.x, size.y, size.z
                ));
            }
            None => {
                log.warn("No bounding box found");
            }
        }
        match &scene.user_data {
            Some(data) => log.info(format!("User data found: {data}")),
            None => log.info("No user data found"),
        };
        let s = scene.stats;
        log.info(format!(
            "Scene: {} nodes, {} meshes, {} vertices, {} triangles, {} materials",
            scene.nodes.len(),
            s.meshes,
            s.vertices,
            s.triangles,
            s.materials
        ));
        for warning in &scene.warnings {
            log.warn(warning.clone());
        }

        let embedded = scene.embedded.coordinates.filter(|loc| match loc.validate() {
            Ok(()) => true,
            Err(e) => {
                log.warn(format!(
                    "Ignoring embedded coordinates {}: {e}",
                    fmt_coords(loc.as_array())
                ));
                false
            }
        });
        let resolved = request.placement.resolve(embedded);
        let locator = request.asset.locator();
        let name = scene
            .name
            .clone()
            .or_else(|| locator.file_name().map(str::to_owned))
            .unwrap_or_else(|| locator.to_string());
        let mut object = OverlayObject::model(name, Arc::new(scene), request.asset.units());

        info.positioning = Some(match resolved {
            ResolvedLocation::Embedded(loc) => {
                log.info(format!(
                    "Keeping embedded location {}",
                    fmt_coords(loc.as_array())
                ));
                Positioning::Embedded
            }
            ResolvedLocation::Assigned(loc) => {
                log.info(format!("Positioning model at {}", fmt_coords(loc.as_array())));
                Positioning::Assigned
            }
            ResolvedLocation::Skipped => {
                log.warn("No usable geolocation in model; positioning skipped");
                Positioning::Skipped
            }
        });

        if let Some(loc) = resolved.location() {
            object
                .set_coords(request.transform_at(loc))
                .map_err(|e| LoadFailure::ParseException(e.to_string()))?;
            info.location = Some(loc);
            log.success(format!("Model positioned at {}", fmt_coords(loc.as_array())));
        }
        if let Some(rotation) = request.placement.rotation {
            object
                .set_rotation(rotation)
                .map_err(|e| LoadFailure::ParseException(e.to_string()))?;
            log.info(format!(
                "Model rotated to {} rad",
                fmt_coords(rotation.as_array())
            ));
        }

        log.info("Adding model to scene...");
        let id = overlay.add(object);
        info.object_id = Some(id.0);
        log.success("Model added to scene successfully");

        diag.update(|s| s.model = Some(info));
        diag.set_status(LoadStatus::Loaded);
        Ok(())
    }

    async fn follow_up(
        &self,
        format: AssetFormat,
        payload: &AssetPayload,
        diag: &LoadDiagnostic,
        delayed: bool,
    ) {
        if !self.settings.auto_diagnose {
            return;
        }
        if delayed {
            tokio::time::sleep(self.settings.diagnostic_delay()).await;
        }
        let verdict = self.diagnose(format, payload, diag.log());
        diag.update(|s| s.verdict = Some(verdict));
    }

    /// Read-only structural check of an already fetched payload.
    pub fn diagnose(
        &self,
        format: AssetFormat,
        payload: &AssetPayload,
        log: &DiagnosticLog,
    ) -> Verdict {
        log.info(format!("Testing with secondary loader ({})...", self.probe.name()));
        match self.probe.inspect(format, payload) {
            Ok(report) => {
                let summary = report.summary_lines();
                for line in &summary {
                    log.info(line.clone());
                }
                log.success(format!(
                    "Secondary loader read the {} structure",
                    match report {
                        StructureReport::Glb(_) => "GLB",
                        StructureReport::Obj(_) => "OBJ",
                    }
                ));
                log.info("Payload is structurally sound; the primary importer may not support it");
                Verdict::PayloadValid { summary }
            }
            Err(e) => {
                log.error(format!("Secondary loader failed: {e}"));
                log.info("Payload appears corrupt or incompatible");
                Verdict::PayloadMalformed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Manual diagnostic run: fetch and probe without touching status or overlay.
    pub async fn run_diagnostic(
        &self,
        request: &AssetRequest,
        log: &DiagnosticLog,
    ) -> Result<Verdict, LoadFailure> {
        log.info(format!(
            "Manual diagnostic for {}",
            request.asset.locator()
        ));
        let payload = match self.fetch_payload(request, log).await {
            Ok(payload) => payload,
            Err(failure) => {
                log.error(format!("Diagnostic fetch failed: {failure}"));
                return Err(failure);
            }
        };
        Ok(self.diagnose(request.asset.format(), &payload, log))
    }
}
