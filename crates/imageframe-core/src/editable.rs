//! The editable image model.
//!
//! While an image is edited it lives inside a two-level scaffold:
//!
//! ```text
//! <div class="imageframe-wrapper orientation-t">       sized to the rotated bounds
//!   <div class="imageframe-inner rot-deg-0">           unrotated size, carries rotation
//!     <img style="width; height; left; top">           the crop rectangle
//!     <span class="imageframe-control imageframe-coords">
//!   </div>
//!   ...overlays and handles (control nodes)
//! </div>
//! ```
//!
//! Rotation is persisted as a `rot-deg-<n>` class rather than an inline
//! transform so it survives HTML sanitizers.

use crate::classes;
use crate::dom::{Document, MutationBatch, NodeId, Style, parse_px};
use crate::error::{Error, Result};
use crate::events::{EventQueue, ImageEvent};
use crate::geometry::{measure_box_model, rotate_vec, rotated_bounds};
use crate::orientation::{Orientation, round_rotation};
use crate::watcher::DeletionWatcher;
use kurbo::{Point, Size, Vec2};

/// Sizes closer than this are treated as equal.
const SIZE_EPSILON: f64 = 1e-6;

/// One image under edit, with its scaffold and transform state.
#[derive(Debug)]
pub struct EditableImage {
    target: NodeId,
    wrapper: NodeId,
    inner_wrapper: NodeId,
    coords: NodeId,
    size: Size,
    rotation: u16,
    orientation: Orientation,
    original_size: Size,
    original_offset: Point,
    enabled: bool,
    watcher: DeletionWatcher,
    events: EventQueue<ImageEvent>,
}

impl EditableImage {
    /// Wrap `target` in an editing scaffold, or adopt the one already around it.
    pub fn attach(doc: &mut Document, target: NodeId) -> Result<Self> {
        if doc.tag(target) != Some("img") {
            return Err(Error::NotAnImage(target));
        }
        let parent = doc.parent(target).ok_or(Error::DetachedNode(target))?;

        let existing = doc
            .parent(parent)
            .filter(|&w| doc.has_class(parent, classes::INNER_WRAPPER) && doc.has_class(w, classes::WRAPPER));

        let image = match existing {
            Some(wrapper) => Self::adopt(doc, target, wrapper, parent)?,
            None => Self::wrap(doc, target, parent)?,
        };
        log::debug!(
            "Attached image {:?}: size {}x{}, rotation {}",
            target,
            image.size.width,
            image.size.height,
            image.rotation
        );
        Ok(image)
    }

    fn wrap(doc: &mut Document, target: NodeId, parent: NodeId) -> Result<Self> {
        let size = initial_size(doc, target);

        let wrapper = doc.create_element("div");
        doc.add_class(wrapper, classes::WRAPPER)?;
        doc.add_class(wrapper, &classes::orientation_class(Orientation::T.as_str()))?;
        doc.set_attribute(wrapper, "contenteditable", "false")?;
        let inner_wrapper = doc.create_element("div");
        doc.add_class(inner_wrapper, classes::INNER_WRAPPER)?;
        doc.add_class(inner_wrapper, &classes::rotation_class(0))?;

        doc.insert_before(parent, wrapper, Some(target))?;
        doc.append_child(wrapper, inner_wrapper)?;
        doc.append_child(inner_wrapper, target)?;

        if let Some(position) = doc.flow_position(target) {
            doc.set_flow_position(wrapper, position)?;
            doc.clear_flow_position(target)?;
        }
        doc.remove_attribute(target, "width")?;
        doc.remove_attribute(target, "height")?;

        let coords = create_coords(doc, inner_wrapper)?;
        let mut image = Self::new(target, wrapper, inner_wrapper, coords);
        image.size = size;
        image.original_size = size;
        image.write_geometry(doc)?;
        Ok(image)
    }

    fn adopt(doc: &mut Document, target: NodeId, wrapper: NodeId, inner_wrapper: NodeId) -> Result<Self> {
        // Leftovers of an earlier session are rebuilt from scratch.
        for stale in doc.find_by_class(wrapper, classes::CONTROL) {
            if doc.parent(stale).is_some() {
                doc.remove(stale)?;
            }
        }
        let coords = create_coords(doc, inner_wrapper)?;

        let inner_style = doc.style(inner_wrapper).cloned().unwrap_or_default();
        let target_style = doc.style(target).cloned().unwrap_or_default();
        let size = inner_style
            .size()
            .unwrap_or_else(|| initial_size(doc, target));
        let rotation = doc
            .classes(inner_wrapper)
            .iter()
            .find_map(|c| classes::parse_rotation_class(c))
            .unwrap_or(0);

        let mut image = Self::new(target, wrapper, inner_wrapper, coords);
        image.size = size;
        image.rotation = rotation;
        image.orientation = Orientation::from_degrees(f64::from(rotation));
        image.original_size = target_style.size().unwrap_or(size);
        image.original_offset = target_style.position();
        image.write_geometry(doc)?;
        Ok(image)
    }

    fn new(target: NodeId, wrapper: NodeId, inner_wrapper: NodeId, coords: NodeId) -> Self {
        Self {
            target,
            wrapper,
            inner_wrapper,
            coords,
            size: Size::ZERO,
            rotation: 0,
            orientation: Orientation::T,
            original_size: Size::ZERO,
            original_offset: Point::ZERO,
            enabled: false,
            watcher: DeletionWatcher::new(target),
            events: EventQueue::new(),
        }
    }

    // --- Accessors ---

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    pub fn inner_wrapper(&self) -> NodeId {
        self.inner_wrapper
    }

    /// The coordinate helper pinned at the inner wrapper's local origin.
    pub fn coords(&self) -> NodeId {
        self.coords
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Rotation in whole degrees, `0..360`.
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Rotation left over once the orientation's quarter turn is removed.
    pub fn residual_rotation(&self) -> f64 {
        f64::from(self.rotation) - self.orientation.base_angle()
    }

    pub fn original_size(&self) -> Size {
        self.original_size
    }

    pub fn original_offset(&self) -> Point {
        self.original_offset
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether anything would be lost by unwrapping the image.
    pub fn is_transformed(&self) -> bool {
        self.rotation != 0
            || self.original_offset.to_vec2().hypot() > SIZE_EPSILON
            || (self.original_size.width - self.size.width).abs() > SIZE_EPSILON
            || (self.original_size.height - self.size.height).abs() > SIZE_EPSILON
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<ImageEvent> {
        self.events.take()
    }

    // --- Lifecycle ---

    /// Make the scaffold interactive and start watching for deletion.
    pub fn enable(&mut self, doc: &mut Document) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        doc.set_attribute(self.wrapper, "contenteditable", "true")?;
        doc.add_class(self.wrapper, classes::ACTIVE)?;
        self.watcher.start(doc)?;
        self.enabled = true;
        Ok(())
    }

    pub fn disable(&mut self, doc: &mut Document) -> Result<()> {
        self.watcher.stop(doc);
        if !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        doc.set_attribute(self.wrapper, "contenteditable", "false")?;
        doc.remove_class(self.wrapper, classes::ACTIVE)
    }

    /// Route a click on `node` to the model's events.
    ///
    /// Returns false when the model is disabled or `node` lies outside the
    /// scaffold.
    pub fn handle_click(&mut self, doc: &Document, node: NodeId, double: bool) -> bool {
        if !self.enabled || !doc.contains(self.wrapper, node) {
            return false;
        }
        self.events.emit(if double {
            ImageEvent::DoubleClick(node)
        } else {
            ImageEvent::Click(node)
        });
        true
    }

    /// Feed one checkpoint of mutation records to the deletion watcher.
    ///
    /// On deletion the model disables itself, drops what is left of the
    /// scaffold and emits [`ImageEvent::Delete`].
    pub fn handle_mutations(&mut self, doc: &mut Document, batches: &[MutationBatch]) -> Result<bool> {
        if !self.watcher.handle_batches(batches) {
            return Ok(false);
        }
        log::debug!("Image {:?} deleted from the document", self.target);
        self.disable(doc)?;
        if doc.parent(self.wrapper).is_some() {
            doc.remove(self.wrapper)?;
        }
        self.events.emit(ImageEvent::Delete);
        Ok(true)
    }

    /// Leave edit mode for good.
    ///
    /// Control nodes are stripped. A transformed image keeps its wrapper and
    /// inner wrapper as saved content; an untouched one is unwrapped back to
    /// a plain `<img>` carrying its size as attributes.
    pub fn release(&mut self, doc: &mut Document) -> Result<()> {
        self.disable(doc)?;
        for control in doc.find_by_class(self.wrapper, classes::CONTROL) {
            if doc.parent(control).is_some() {
                doc.remove(control)?;
            }
        }
        if doc.parent(self.wrapper).is_none() || self.is_transformed() {
            return Ok(());
        }

        doc.replace_with(self.wrapper, self.target)?;
        if let Some(position) = doc.flow_position(self.wrapper) {
            doc.set_flow_position(self.target, position)?;
        }
        doc.style_mut(self.target)?.clear_geometry();
        doc.set_attribute(self.target, "width", &attribute_px(self.size.width))?;
        doc.set_attribute(self.target, "height", &attribute_px(self.size.height))?;
        log::debug!("Unwrapped untouched image {:?}", self.target);
        Ok(())
    }

    // --- Transform ---

    /// Resize the visible box, scaling the crop rectangle along with it.
    pub fn set_size(&mut self, doc: &mut Document, size: Size) -> Result<()> {
        let ratio_x = ratio(size.width, self.size.width);
        let ratio_y = ratio(size.height, self.size.height);
        self.original_size = Size::new(
            self.original_size.width * ratio_x,
            self.original_size.height * ratio_y,
        );
        self.original_offset = Point::new(
            self.original_offset.x * ratio_x,
            self.original_offset.y * ratio_y,
        );
        self.size = size;
        self.write_geometry(doc)?;
        self.events.emit(ImageEvent::Transform);
        Ok(())
    }

    /// Rotate to `angle` degrees; stored rounded to a whole degree.
    pub fn set_rotation(&mut self, doc: &mut Document, angle: f64) -> Result<()> {
        self.rotation = round_rotation(angle);
        self.orientation = Orientation::from_degrees(f64::from(self.rotation));

        let class = classes::rotation_class(self.rotation);
        let mut tagged = vec![self.inner_wrapper];
        tagged.extend(
            doc.children(self.wrapper)
                .iter()
                .copied()
                .filter(|&c| doc.has_class(c, classes::CONTROL)),
        );
        for node in tagged {
            doc.retain_classes(node, |c| !classes::is_rotation_class(c))?;
            doc.add_class(node, &class)?;
        }
        self.events.emit(ImageEvent::Transform);
        Ok(())
    }

    /// Set the displayed size of the full image inside the inner wrapper.
    pub fn set_original_img_size(&mut self, doc: &mut Document, size: Size) -> Result<()> {
        self.original_size = size;
        self.write_geometry(doc)?;
        self.events.emit(ImageEvent::Transform);
        Ok(())
    }

    /// Set where the full image sits relative to the inner wrapper.
    pub fn set_original_img_offset(&mut self, doc: &mut Document, offset: Point) -> Result<()> {
        self.original_offset = offset;
        self.write_geometry(doc)?;
        self.events.emit(ImageEvent::Transform);
        Ok(())
    }

    fn write_geometry(&self, doc: &mut Document) -> Result<()> {
        doc.style_mut(self.inner_wrapper)?.set_size(self.size);
        let target = doc.style_mut(self.target)?;
        target.set_size(self.original_size);
        target.set_position(self.original_offset);
        Ok(())
    }

    /// Fit the wrapper to the rotated inner wrapper and re-select it.
    pub fn recalculate_wrapper(&mut self, doc: &mut Document) -> Result<()> {
        let bounds = rotated_bounds(self.size, f64::from(self.rotation));
        doc.style_mut(self.wrapper)?.set_size(bounds);

        for child in doc.children(self.wrapper).to_vec() {
            if !doc.is_element(child) {
                continue;
            }
            let child_size = if child == self.inner_wrapper {
                self.size
            } else {
                doc.style(child).and_then(Style::size).unwrap_or(Size::ZERO)
            };
            doc.style_mut(child)?.set_position(Point::new(
                (bounds.width - child_size.width) / 2.0,
                (bounds.height - child_size.height) / 2.0,
            ));
        }

        let orientation = classes::orientation_class(self.orientation.as_str());
        doc.retain_classes(self.wrapper, |c| !classes::is_orientation_class(c))?;
        doc.add_class(self.wrapper, &orientation)?;

        self.events.emit(ImageEvent::Recalculated);
        if doc.parent(self.wrapper).is_some() {
            doc.select_node(self.wrapper)?;
        }
        Ok(())
    }

    /// Append a control node to the wrapper, already turned to the current angle.
    pub fn add_control(&self, doc: &mut Document, node: NodeId) -> Result<()> {
        doc.add_class(node, classes::CONTROL)?;
        doc.add_class(node, &classes::rotation_class(self.rotation))?;
        doc.append_child(self.wrapper, node)
    }

    /// Detach a control node previously added with [`add_control`](Self::add_control).
    pub fn remove_control(&self, doc: &mut Document, node: NodeId) -> Result<()> {
        if doc.parent(node) == Some(self.wrapper) {
            doc.remove(node)?;
        }
        Ok(())
    }

    // --- Screen geometry ---

    /// Unrotated top-left of the wrapper on the page.
    pub fn wrapper_origin(&self, doc: &Document) -> Point {
        doc.page_position(self.wrapper)
    }

    /// Centre of the image on screen; rotation never moves it.
    pub fn center(&self, doc: &Document) -> Point {
        doc.page_position(self.inner_wrapper) + self.size.to_vec2() / 2.0
    }

    /// Map a point of the inner wrapper's unrotated space to the screen.
    pub fn local_to_screen(&self, doc: &Document, local: Point) -> Point {
        let from_center = local.to_vec2() - self.size.to_vec2() / 2.0;
        self.center(doc) + rotate_vec(from_center, f64::from(self.rotation))
    }

    pub fn screen_to_local(&self, doc: &Document, screen: Point) -> Point {
        let from_center: Vec2 = screen - self.center(doc);
        (self.size.to_vec2() / 2.0 + rotate_vec(from_center, -f64::from(self.rotation))).to_point()
    }

    /// Screen position of the coordinate helper, the inner wrapper's
    /// rotated top-left corner.
    pub fn reference_point(&self, doc: &Document) -> Point {
        let local = doc.style(self.coords).map(Style::position).unwrap_or(Point::ZERO);
        self.local_to_screen(doc, local)
    }
}

/// The image held by a saved scaffold.
pub fn image_in_wrapper(doc: &Document, wrapper: NodeId) -> Result<NodeId> {
    doc.children(wrapper)
        .iter()
        .copied()
        .find(|&child| doc.has_class(child, classes::INNER_WRAPPER))
        .and_then(|inner| {
            doc.children(inner)
                .iter()
                .copied()
                .find(|&child| doc.tag(child) == Some("img"))
        })
        .ok_or(Error::MissingScaffold(wrapper))
}

fn create_coords(doc: &mut Document, inner_wrapper: NodeId) -> Result<NodeId> {
    let coords = doc.create_element("span");
    doc.add_class(coords, classes::CONTROL)?;
    doc.add_class(coords, classes::COORDS)?;
    doc.style_mut(coords)?.set_position(Point::ZERO);
    doc.append_child(inner_wrapper, coords)?;
    Ok(coords)
}

/// Size from the `width`/`height` attributes, falling back to the content
/// box of the inline style.
fn initial_size(doc: &Document, target: NodeId) -> Size {
    let style = doc.style(target);
    let content = doc.box_metrics(target).map(|metrics| measure_box_model(&metrics));
    let width = doc
        .attribute(target, "width")
        .and_then(parse_px)
        .or_else(|| style.and_then(|s| s.width).and(content.map(|c| c.width)));
    let height = doc
        .attribute(target, "height")
        .and_then(parse_px)
        .or_else(|| style.and_then(|s| s.height).and(content.map(|c| c.height)));
    if width.is_none() || height.is_none() {
        log::warn!("Image {:?} has no usable width/height", target);
    }
    Size::new(width.unwrap_or(0.0), height.unwrap_or(0.0))
}

fn ratio(new: f64, old: f64) -> f64 {
    if old.abs() < SIZE_EPSILON { 1.0 } else { new / old }
}

fn attribute_px(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-3 {
        format!("{}", rounded as i64)
    } else {
        format!("{value}")
    }
}
