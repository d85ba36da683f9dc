//! Resize overlay.

use super::Control;
use super::handles::HandleKind;
use super::overlay::{Overlay, OverlayFrame};
use crate::classes;
use crate::config::PluginConfig;
use crate::dom::Document;
use crate::editable::EditableImage;
use crate::error::Result;
use crate::events::ImageEvent;
use crate::geometry::transpose;
use crate::input::{DragState, PointerEvent};

/// Eight-handle overlay that resizes the image.
///
/// Dragging only reshapes the overlay; the image itself is resized once,
/// when the drag ends.
#[derive(Debug)]
pub struct ResizeControl {
    keep_aspect_ratio: bool,
    handle_size: f64,
    min_size: f64,
    overlay: Option<Overlay>,
    frame: Option<OverlayFrame>,
    drag: Option<DragState<HandleKind>>,
}

impl ResizeControl {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            keep_aspect_ratio: config.keep_aspect_ratio,
            handle_size: config.handle_size,
            min_size: config.min_size,
            overlay: None,
            frame: None,
            drag: None,
        }
    }

    pub fn keep_aspect_ratio(&self) -> bool {
        self.keep_aspect_ratio
    }

    /// Current overlay geometry, including a drag in progress.
    pub fn frame(&self) -> Option<OverlayFrame> {
        let frame = self.frame?;
        Some(match &self.drag {
            Some(drag) => frame.resized(drag.grip, drag.delta(), self.keep_aspect_ratio, self.min_size),
            None => frame,
        })
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Overlay geometry matching the image: same centre, size in the
    /// orientation's frame, turned by what the orientation leaves over.
    fn frame_for(doc: &Document, image: &EditableImage) -> OverlayFrame {
        let size = if image.orientation().is_sideways() {
            transpose(image.size())
        } else {
            image.size()
        };
        OverlayFrame::new(image.center(doc), size, image.residual_rotation())
    }

    fn realign(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        self.frame = Some(Self::frame_for(doc, image));
        self.layout(doc, image)
    }

    fn layout(&self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        if let (Some(overlay), Some(frame)) = (&self.overlay, self.frame()) {
            overlay.layout(doc, image.wrapper_origin(doc), &frame, self.handle_size)?;
        }
        Ok(())
    }
}

impl Control for ResizeControl {
    fn enable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        if self.overlay.is_some() {
            return Ok(());
        }
        self.overlay = Some(Overlay::create(doc, image, classes::RESIZE_OVERLAY)?);
        log::debug!("Resize control enabled on {:?}", image.target());
        self.realign(doc, image)
    }

    fn disable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        self.drag = None;
        self.frame = None;
        if let Some(overlay) = self.overlay.take() {
            overlay.remove(doc, image)?;
            log::debug!("Resize control disabled on {:?}", image.target());
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.overlay.is_some()
    }

    fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn on_image_event(&mut self, doc: &mut Document, image: &EditableImage, event: ImageEvent) -> Result<()> {
        match event {
            ImageEvent::Transform | ImageEvent::Recalculated if self.is_enabled() && !self.is_dragging() => {
                self.realign(doc, image)
            }
            ImageEvent::Delete => {
                self.drag = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_pointer(&mut self, doc: &mut Document, image: &mut EditableImage, event: &PointerEvent) -> Result<bool> {
        let (Some(overlay), Some(frame)) = (&self.overlay, self.frame) else {
            return Ok(false);
        };
        match *event {
            PointerEvent::Down { position, target } => {
                let grip = target
                    .and_then(|node| overlay.handle_for(node))
                    .or_else(|| frame.hit_test(position, self.handle_size));
                match grip {
                    Some(grip) => {
                        self.drag = Some(DragState::new(grip, position));
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            PointerEvent::Move { position } => {
                let Some(drag) = self.drag.as_mut() else {
                    return Ok(false);
                };
                drag.current_point = position;
                self.layout(doc, image)?;
                Ok(true)
            }
            PointerEvent::Up { position } => {
                let Some(mut drag) = self.drag.take() else {
                    return Ok(false);
                };
                drag.current_point = position;
                let result = frame.resized(drag.grip, drag.delta(), self.keep_aspect_ratio, self.min_size);
                let size = if image.orientation().is_sideways() {
                    transpose(result.size)
                } else {
                    result.size
                };
                log::debug!("Resize ended: {}x{}", size.width, size.height);
                image.set_size(doc, size)?;
                image.recalculate_wrapper(doc)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::handles::{Corner, Edge};
    use kurbo::{Point, Size};

    fn setup(keep_aspect_ratio: bool) -> (Document, EditableImage, ResizeControl) {
        let mut doc = Document::from_html("<img src=\"a.png\" width=\"100\" height=\"50\">").unwrap();
        let img = doc.find_by_tag(doc.root(), "img")[0];
        let mut image = EditableImage::attach(&mut doc, img).unwrap();
        image.recalculate_wrapper(&mut doc).unwrap();
        let config = PluginConfig {
            keep_aspect_ratio,
            ..PluginConfig::default()
        };
        let mut control = ResizeControl::new(&config);
        control.enable(&mut doc, &image).unwrap();
        (doc, image, control)
    }

    fn drag(doc: &mut Document, image: &mut EditableImage, control: &mut ResizeControl, from: Point, to: Point) {
        let down = PointerEvent::Down { position: from, target: None };
        assert!(control.handle_pointer(doc, image, &down).unwrap());
        control
            .handle_pointer(doc, image, &PointerEvent::Move { position: to })
            .unwrap();
        control
            .handle_pointer(doc, image, &PointerEvent::Up { position: to })
            .unwrap();
    }

    #[test]
    fn test_enable_creates_overlay_with_handles() {
        let (doc, image, control) = setup(false);
        let overlay = control.overlay().unwrap().node();
        assert_eq!(doc.parent(overlay), Some(image.wrapper()));
        assert!(doc.has_class(overlay, classes::CONTROL));
        assert_eq!(doc.children(overlay).len(), 8);
        assert_eq!(doc.style(overlay).and_then(|s| s.size()), Some(Size::new(100.0, 50.0)));
    }

    #[test]
    fn test_move_only_previews() {
        let (mut doc, mut image, mut control) = setup(false);
        let handle = doc.find_by_class(image.wrapper(), "imageframe-handle-br")[0];
        let down = PointerEvent::Down {
            position: Point::new(100.0, 50.0),
            target: Some(handle),
        };
        control.handle_pointer(&mut doc, &mut image, &down).unwrap();
        control
            .handle_pointer(&mut doc, &mut image, &PointerEvent::Move { position: Point::new(120.0, 60.0) })
            .unwrap();

        assert_eq!(image.size(), Size::new(100.0, 50.0));
        let overlay = control.overlay().unwrap().node();
        assert_eq!(doc.style(overlay).and_then(|s| s.size()), Some(Size::new(120.0, 60.0)));
    }

    #[test]
    fn test_drag_end_resizes_image() {
        let (mut doc, mut image, mut control) = setup(false);
        drag(&mut doc, &mut image, &mut control, Point::new(100.0, 50.0), Point::new(150.0, 70.0));
        assert_eq!(image.size(), Size::new(150.0, 70.0));
        assert_eq!(doc.style(image.wrapper()).and_then(|s| s.size()), Some(Size::new(150.0, 70.0)));
        assert!(!control.is_dragging());
    }

    #[test]
    fn test_aspect_lock() {
        let (mut doc, mut image, mut control) = setup(true);
        drag(&mut doc, &mut image, &mut control, Point::new(100.0, 25.0), Point::new(200.0, 25.0));
        assert_eq!(image.size(), Size::new(200.0, 100.0));
    }

    #[test]
    fn test_sideways_image_swaps_axes() {
        let (mut doc, mut image, mut control) = setup(false);
        image.set_rotation(&mut doc, 90.0).unwrap();
        image.recalculate_wrapper(&mut doc).unwrap();
        for event in image.take_events() {
            control.on_image_event(&mut doc, &image, event).unwrap();
        }
        // On screen the image is now 50 wide and 100 tall.
        let frame = control.frame().unwrap();
        assert_eq!(frame.size, Size::new(50.0, 100.0));

        let bottom = frame.handles()
            .into_iter()
            .find(|h| h.kind == HandleKind::Edge(Edge::Bottom))
            .unwrap()
            .position;
        drag(&mut doc, &mut image, &mut control, bottom, bottom + kurbo::Vec2::new(0.0, 20.0));
        // Screen height is the image's width.
        assert!((image.size().width - 120.0).abs() < 1e-9);
        assert!((image.size().height - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_disable_removes_overlay_mid_drag() {
        let (mut doc, mut image, mut control) = setup(false);
        let corner = control.frame().unwrap().corner(Corner::TopLeft);
        let down = PointerEvent::Down { position: corner, target: None };
        control.handle_pointer(&mut doc, &mut image, &down).unwrap();
        assert!(control.is_dragging());

        control.disable(&mut doc, &image).unwrap();
        assert!(!control.is_dragging());
        assert!(doc.find_by_class(image.wrapper(), classes::RESIZE_OVERLAY).is_empty());
        let up = PointerEvent::Up { position: Point::ZERO };
        assert!(!control.handle_pointer(&mut doc, &mut image, &up).unwrap());
        assert_eq!(image.size(), Size::new(100.0, 50.0));
    }
}
