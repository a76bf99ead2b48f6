//! A mounted page: map view, overlay, custom layer and diagnostic record.

use std::sync::Arc;

use formats::{AssetRequest, RequestError};
use layers::{
    BuildingsLayer, CustomLayer, MapConfig, MapError, MapState, MapView, ModelOverlay, Overlay,
    OverlayObject,
};
use runtime::{Frame, ScopedTask};
use scene::ModelTransform;

use crate::config::{BuildingsMode, PageContent, PageVariant, PrimitiveSpec};
use crate::error::LoadFailure;
use crate::flow::AssetLoadFlow;
use crate::status::{LoadDiagnostic, LoadReport, LoadState, Verdict};

pub const MODEL_LAYER_ID: &str = "custom-model-layer";
pub const PRIMITIVES_LAYER_ID: &str = "custom-threebox-model";

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Starts the load flow when the map adds it; stops it when removed.
pub struct ModelLayer {
    flow: Arc<AssetLoadFlow>,
    request: AssetRequest,
    overlay: Arc<ModelOverlay>,
    diagnostic: LoadDiagnostic,
    task: Option<ScopedTask<LoadReport>>,
}

impl ModelLayer {
    pub fn new(
        flow: Arc<AssetLoadFlow>,
        request: AssetRequest,
        overlay: Arc<ModelOverlay>,
        diagnostic: LoadDiagnostic,
    ) -> Self {
        Self {
            flow,
            request,
            overlay,
            diagnostic,
            task: None,
        }
    }
}

impl CustomLayer for ModelLayer {
    fn id(&self) -> &str {
        MODEL_LAYER_ID
    }

    fn on_add(&mut self, _map: &MapConfig) {
        if self.task.is_some() {
            return;
        }
        let flow = Arc::clone(&self.flow);
        let request = self.request.clone();
        let overlay = Arc::clone(&self.overlay);
        let diagnostic = self.diagnostic.clone();
        self.task = Some(ScopedTask::spawn("asset-load", async move {
            flow.run(&request, overlay.as_ref(), &diagnostic).await
        }));
    }

    fn render(&mut self, frame: Frame) {
        self.overlay.update(frame);
    }

    fn on_remove(&mut self) {
        // Dropping the task aborts the fetch, the import and any pending timer.
        self.task = None;
        self.overlay.clear();
    }
}

/// Procedural shapes with per-frame spin.
pub struct PrimitivesLayer {
    overlay: Arc<ModelOverlay>,
    primitives: Vec<PrimitiveSpec>,
    added: bool,
}

impl PrimitivesLayer {
    pub fn new(overlay: Arc<ModelOverlay>, primitives: Vec<PrimitiveSpec>) -> Self {
        Self {
            overlay,
            primitives,
            added: false,
        }
    }
}

impl CustomLayer for PrimitivesLayer {
    fn id(&self) -> &str {
        PRIMITIVES_LAYER_ID
    }

    fn on_add(&mut self, _map: &MapConfig) {
        if self.added {
            return;
        }
        self.added = true;
        for p in &self.primitives {
            let mut object = OverlayObject::shape(p.name.clone(), p.drawable).with_spin(p.spin);
            if let Err(e) = object.set_coords(ModelTransform::at(p.at)) {
                tracing::warn!(name = %p.name, error = %e, "primitive not placed");
                continue;
            }
            self.overlay.add(object);
        }
    }

    fn render(&mut self, frame: Frame) {
        self.overlay.update(frame);
    }

    fn on_remove(&mut self) {
        self.overlay.clear();
    }
}

pub struct Page {
    variant: PageVariant,
    map: MapView,
    buildings: Option<BuildingsLayer>,
    overlay: Arc<ModelOverlay>,
    diagnostic: LoadDiagnostic,
    flow: Arc<AssetLoadFlow>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("variant", &self.variant.name)
            .field("map", &self.map)
            .field("objects", &self.overlay.len())
            .finish()
    }
}

impl Page {
    /// Creates the map and queues the page's layer; nothing loads until
    /// [`Page::style_ready`].
    pub fn mount(
        variant: &PageVariant,
        defaults: &MapConfig,
        flow: Arc<AssetLoadFlow>,
    ) -> Result<Self, PageError> {
        let mut map = MapView::new(variant.map_config(defaults))?;
        let overlay = Arc::new(ModelOverlay::new());
        let diagnostic = LoadDiagnostic::new();
        let buildings = match variant.buildings {
            BuildingsMode::Off => None,
            BuildingsMode::Static => Some(BuildingsLayer::install(&mut map, false)?),
            BuildingsMode::Hover => Some(BuildingsLayer::install(&mut map, true)?),
        };

        match &variant.page {
            PageContent::Basemap => {}
            PageContent::Primitives { primitives } => {
                map.add_layer(Box::new(PrimitivesLayer::new(
                    Arc::clone(&overlay),
                    primitives.clone(),
                )))?;
            }
            PageContent::Model { .. } => {
                if let Some(request) = variant.request() {
                    request.validate()?;
                    map.add_layer(Box::new(ModelLayer::new(
                        Arc::clone(&flow),
                        request,
                        Arc::clone(&overlay),
                        diagnostic.clone(),
                    )))?;
                }
            }
        }
        tracing::info!(page = %variant.name, route = %variant.route, "page mounted");

        Ok(Self {
            variant: variant.clone(),
            map,
            buildings,
            overlay,
            diagnostic,
            flow,
        })
    }

    pub fn variant(&self) -> &PageVariant {
        &self.variant
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn overlay(&self) -> &Arc<ModelOverlay> {
        &self.overlay
    }

    pub fn diagnostic(&self) -> &LoadDiagnostic {
        &self.diagnostic
    }

    pub fn buildings(&self) -> Option<&BuildingsLayer> {
        self.buildings.as_ref()
    }

    /// Pointer over building `id`; `false` when the page does not track hover.
    pub fn hover_building(&mut self, id: u64) -> bool {
        match &mut self.buildings {
            Some(layer) => layer.hover_enter(&mut self.map, id),
            None => false,
        }
    }

    /// Pointer left the buildings layer.
    pub fn leave_buildings(&mut self) -> bool {
        match &mut self.buildings {
            Some(layer) => layer.hover_leave(&mut self.map),
            None => false,
        }
    }

    pub fn style_ready(&mut self) {
        self.map.style_ready();
    }

    pub fn render_frame(&mut self) -> Option<Frame> {
        self.map.render_frame()
    }

    /// Waits for the model load to finish. `None` for pages without a model
    /// or before the style is ready.
    pub async fn settled(&mut self) -> Option<LoadState> {
        let PageContent::Model { focus, .. } = &self.variant.page else {
            return None;
        };
        let focus = *focus;
        if self.map.state() != MapState::Ready {
            return None;
        }
        let state = self.diagnostic.wait_settled().await;
        if focus {
            if let Some(loc) = state.model.as_ref().and_then(|m| m.location) {
                if let Err(e) = self.map.fly_to([loc.longitude, loc.latitude]) {
                    self.diagnostic.log().warn(format!("Cannot focus camera on model: {e}"));
                }
            }
        }
        Some(state)
    }

    /// The "test with secondary loader" action.
    pub async fn trigger_diagnostic(&self) -> Option<Result<Verdict, LoadFailure>> {
        let request = self.variant.request()?;
        Some(self.flow.run_diagnostic(&request, self.diagnostic.log()).await)
    }

    /// Tears the page down, cancelling any load still running.
    pub fn unmount(mut self) -> LoadReport {
        self.map.remove();
        tracing::info!(page = %self.variant.name, "page unmounted");
        self.diagnostic.report()
    }
}
