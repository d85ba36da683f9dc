//! Rotation handle.

use super::Control;
use super::handles::{Handle, HandleKind};
use crate::classes;
use crate::config::PluginConfig;
use crate::dom::{Document, NodeId};
use crate::editable::EditableImage;
use crate::error::Result;
use crate::events::ImageEvent;
use crate::geometry::{angle_between, rotate_vec};
use crate::input::PointerEvent;
use kurbo::{Point, Size, Vec2};

/// Handle above the image that turns it to follow the pointer.
///
/// The angle is absolute: the image faces wherever the pointer is, seen
/// from the image centre.
#[derive(Debug)]
pub struct RotateControl {
    offset: f64,
    handle_size: f64,
    node: Option<NodeId>,
    dragging: bool,
}

impl RotateControl {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            offset: config.rotate_handle_offset,
            handle_size: config.handle_size,
            node: None,
            dragging: false,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// The handle on screen, above the image's top edge.
    pub fn handle(&self, doc: &Document, image: &EditableImage) -> Handle {
        let above = Vec2::new(0.0, -(image.size().height / 2.0 + self.offset));
        let position = image.center(doc) + rotate_vec(above, f64::from(image.rotation()));
        Handle::new(position, HandleKind::Rotate)
    }

    fn layout(&self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        let Some(node) = self.node else {
            return Ok(());
        };
        let handle = self.handle(doc, image);
        let half = self.handle_size / 2.0;
        let origin = image.wrapper_origin(doc);
        let style = doc.style_mut(node)?;
        style.set_size(Size::new(self.handle_size, self.handle_size));
        style.set_position(Point::new(
            handle.position.x - origin.x - half,
            handle.position.y - origin.y - half,
        ));
        Ok(())
    }

    fn rotate_to(&self, doc: &mut Document, image: &mut EditableImage, pointer: Point) -> Result<()> {
        let angle = angle_between(image.center(doc), pointer);
        image.set_rotation(doc, angle)
    }
}

impl Control for RotateControl {
    fn enable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        if self.node.is_some() {
            return Ok(());
        }
        let node = doc.create_element("span");
        doc.add_class(node, classes::ROTATE_HANDLE)?;
        doc.add_class(node, HandleKind::Rotate.class_name())?;
        image.add_control(doc, node)?;
        self.node = Some(node);
        log::debug!("Rotate control enabled on {:?}", image.target());
        self.layout(doc, image)
    }

    fn disable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        self.dragging = false;
        if let Some(node) = self.node.take() {
            image.remove_control(doc, node)?;
            log::debug!("Rotate control disabled on {:?}", image.target());
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.node.is_some()
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn on_image_event(&mut self, doc: &mut Document, image: &EditableImage, event: ImageEvent) -> Result<()> {
        match event {
            ImageEvent::Transform | ImageEvent::Recalculated => self.layout(doc, image),
            ImageEvent::Delete => {
                self.dragging = false;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_pointer(&mut self, doc: &mut Document, image: &mut EditableImage, event: &PointerEvent) -> Result<bool> {
        let Some(node) = self.node else {
            return Ok(false);
        };
        match *event {
            PointerEvent::Down { position, target } => {
                let hit = match target {
                    Some(target) => target == node,
                    None => self.handle(doc, image).hit_test(position, self.handle_size),
                };
                self.dragging = hit;
                Ok(hit)
            }
            PointerEvent::Move { position } if self.dragging => {
                self.rotate_to(doc, image, position)?;
                Ok(true)
            }
            PointerEvent::Up { position } if self.dragging => {
                self.dragging = false;
                self.rotate_to(doc, image, position)?;
                log::debug!("Rotation ended at {} degrees", image.rotation());
                image.recalculate_wrapper(doc)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
