//! 3D object overlay drawn on top of the map.
//!
//! Objects are positioned with [`OverlayObject::set_coords`], which anchors
//! them in Web-Mercator world units (for the map camera) and ECEF (for
//! distance queries). Models authored in meters are rescaled by the
//! Mercator stretch at their latitude.

use std::sync::Arc;

use foundation::math::{Ecef, MercatorCoord, Vec3, mercator_units_per_meter};
use parking_lot::Mutex;
use runtime::Frame;
use scene::components::{Drawable3D, Rotation};
use scene::{ModelTransform, PlacementError, SceneHandle, Units};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Model(Arc<SceneHandle>),
    Shape(Drawable3D),
}

/// Where an object sits in the map's world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldAnchor {
    pub mercator: MercatorCoord,
    pub ecef: Ecef,
    /// Per-axis factor from model units to Mercator world units.
    pub world_scale: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayObject {
    pub name: String,
    pub content: OverlayContent,
    pub units: Units,
    /// Rotation added on every overlay update (radians per frame).
    pub spin: Rotation,
    rotation: Rotation,
    coords: Option<ModelTransform>,
    anchor: Option<WorldAnchor>,
}

impl OverlayObject {
    pub fn new(name: impl Into<String>, content: OverlayContent, units: Units) -> Self {
        Self {
            name: name.into(),
            content,
            units,
            spin: Rotation::ZERO,
            rotation: Rotation::ZERO,
            coords: None,
            anchor: None,
        }
    }

    pub fn model(name: impl Into<String>, scene: Arc<SceneHandle>, units: Units) -> Self {
        Self::new(name, OverlayContent::Model(scene), units)
    }

    pub fn shape(name: impl Into<String>, shape: Drawable3D) -> Self {
        Self::new(name, OverlayContent::Shape(shape), Units::Meters)
    }

    pub fn with_spin(mut self, spin: Rotation) -> Self {
        self.spin = spin;
        self
    }

    /// Places the object. Setting the same transform again changes nothing.
    pub fn set_coords(&mut self, transform: ModelTransform) -> Result<(), PlacementError> {
        transform.validate()?;
        let loc = transform.location;
        let scale = transform.scale.to_vec3();
        let world_scale = match self.units {
            Units::Meters => scale * mercator_units_per_meter(loc.latitude),
            Units::Scene => scale,
        };
        self.anchor = Some(WorldAnchor {
            mercator: loc.to_mercator(),
            ecef: loc.to_ecef(),
            world_scale,
        });
        self.rotation = transform.rotation;
        self.coords = Some(transform);
        Ok(())
    }

    /// Turns the object without moving it; the placement transform is kept.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), PlacementError> {
        if !rotation.is_finite() {
            return Err(PlacementError::NonFinite("rotation"));
        }
        self.rotation = rotation;
        Ok(())
    }

    pub fn coords(&self) -> Option<&ModelTransform> {
        self.coords.as_ref()
    }

    pub fn anchor(&self) -> Option<&WorldAnchor> {
        self.anchor.as_ref()
    }

    /// Current orientation, including accumulated spin.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn scene(&self) -> Option<&Arc<SceneHandle>> {
        match &self.content {
            OverlayContent::Model(scene) => Some(scene),
            OverlayContent::Shape(_) => None,
        }
    }
}

pub trait Overlay: Send + Sync {
    fn add(&self, object: OverlayObject) -> ObjectId;

    fn update(&self, frame: Frame);
}

#[derive(Debug, Default)]
struct OverlayState {
    next_id: u64,
    objects: Vec<(ObjectId, OverlayObject)>,
    updates: u64,
    last_frame: Option<Frame>,
}

/// Overlay owned by one page; shared between its layer and its load flow.
#[derive(Debug, Default)]
pub struct ModelOverlay {
    state: Mutex<OverlayState>,
}

impl ModelOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn objects(&self) -> Vec<(ObjectId, OverlayObject)> {
        self.state.lock().objects.clone()
    }

    pub fn get(&self, id: ObjectId) -> Option<OverlayObject> {
        let state = self.state.lock();
        state
            .objects
            .iter()
            .find(|(oid, _)| *oid == id)
            .map(|(_, o)| o.clone())
    }

    pub fn updates(&self) -> u64 {
        self.state.lock().updates
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.state.lock().last_frame
    }

    /// Drops every object; ids keep counting up.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        tracing::debug!(objects = state.objects.len(), "overlay cleared");
        state.objects.clear();
    }
}

impl Overlay for ModelOverlay {
    fn add(&self, object: OverlayObject) -> ObjectId {
        let mut state = self.state.lock();
        let id = ObjectId(state.next_id);
        state.next_id += 1;
        tracing::debug!(id = id.0, name = %object.name, placed = object.anchor.is_some(), "overlay add");
        state.objects.push((id, object));
        id
    }

    fn update(&self, frame: Frame) {
        let mut state = self.state.lock();
        for (_, object) in &mut state.objects {
            object.rotation = object.rotation + object.spin;
        }
        state.updates += 1;
        state.last_frame = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use foundation::math::mercator_units_per_meter;
    use runtime::Frame;
    use scene::components::{Drawable3D, Rotation, Scale};
    use scene::{GeoLocation, ModelTransform, PlacementError, SceneHandle, Units};

    use super::{ModelOverlay, ObjectId, Overlay, OverlayObject};

    const BUCHAREST: GeoLocation = GeoLocation {
        longitude: 26.1025,
        latitude: 44.4268,
        altitude: 0.0,
    };

    fn frame(index: u64) -> Frame {
        Frame {
            index,
            elapsed: Duration::from_millis(16 * index),
            dt: Duration::from_millis(16),
        }
    }

    #[test]
    fn set_coords_twice_is_stable() {
        let mut obj = OverlayObject::model("m", Arc::new(SceneHandle::default()), Units::Meters);
        let t = ModelTransform::at(BUCHAREST);
        obj.set_coords(t).expect("place");
        let first = *obj.anchor().expect("anchor");
        obj.set_coords(t).expect("place again");
        assert_eq!(*obj.anchor().expect("anchor"), first);
        assert_eq!(obj.coords(), Some(&t));
    }

    #[test]
    fn meters_rescale_with_latitude() {
        let mut meters = OverlayObject::model("m", Arc::new(SceneHandle::default()), Units::Meters);
        let mut scene_units = OverlayObject::model("s", Arc::new(SceneHandle::default()), Units::Scene);
        let t = ModelTransform::at(BUCHAREST).with_scale(Scale::Uniform(2.0));
        meters.set_coords(t).expect("place");
        scene_units.set_coords(t).expect("place");

        let upm = mercator_units_per_meter(BUCHAREST.latitude);
        assert!((meters.anchor().expect("anchor").world_scale.x - 2.0 * upm).abs() < 1e-18);
        assert_eq!(scene_units.anchor().expect("anchor").world_scale.x, 2.0);
    }

    #[test]
    fn invalid_coords_leave_object_unplaced() {
        let mut obj = OverlayObject::shape("cube", Drawable3D::cube(50.0, 0xff0000));
        let err = obj
            .set_coords(ModelTransform::at(GeoLocation::new(0.0, 95.0, 0.0)))
            .expect_err("latitude");
        assert_eq!(err, PlacementError::LatitudeOutOfRange(95.0));
        assert!(obj.anchor().is_none());
    }

    #[test]
    fn update_applies_spin() {
        let overlay = ModelOverlay::new();
        let spin = Rotation::new(0.01, 0.01, 0.0);
        let id = overlay.add(OverlayObject::shape("cube", Drawable3D::cube(50.0, 0xff0000)).with_spin(spin));
        assert_eq!(id, ObjectId(0));

        overlay.update(frame(0));
        overlay.update(frame(1));
        let cube = overlay.get(id).expect("cube");
        assert!((cube.rotation().x - 0.02).abs() < 1e-12);
        assert_eq!(cube.rotation().z, 0.0);
        assert_eq!(overlay.updates(), 2);
        assert_eq!(overlay.last_frame().map(|f| f.index), Some(1));
    }

    #[test]
    fn ids_are_sequential() {
        let overlay = ModelOverlay::new();
        let a = overlay.add(OverlayObject::shape("a", Drawable3D::sphere(25.0, 0x00ff00)));
        let b = overlay.add(OverlayObject::shape("b", Drawable3D::sphere(25.0, 0x00ff00)));
        assert_eq!((a, b), (ObjectId(0), ObjectId(1)));
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn set_rotation_keeps_the_placement() {
        let mut obj = OverlayObject::model("m", Arc::new(SceneHandle::default()), Units::Meters);
        let t = ModelTransform::at(BUCHAREST).with_rotation(Rotation::new(1.0, 0.0, 0.0));
        obj.set_coords(t).expect("place");
        assert_eq!(obj.rotation(), t.rotation);

        obj.set_rotation(Rotation::new(0.0, 0.0, 2.0)).expect("turn");
        assert_eq!(obj.rotation(), Rotation::new(0.0, 0.0, 2.0));
        assert_eq!(obj.coords(), Some(&t));
        assert!(obj.set_rotation(Rotation::new(f64::NAN, 0.0, 0.0)).is_err());
        assert_eq!(obj.rotation().z, 2.0);
    }

    #[test]
    fn clear_drops_objects_but_not_the_id_sequence() {
        let overlay = ModelOverlay::new();
        overlay.add(OverlayObject::shape("a", Drawable3D::cube(1.0, 0)));
        overlay.clear();
        assert!(overlay.is_empty());
        let next = overlay.add(OverlayObject::shape("b", Drawable3D::cube(1.0, 0)));
        assert_eq!(next, ObjectId(1));
    }
}
