//! Crop overlay.
//!
//! The overlay outlines the whole image inside the inner wrapper, not just
//! the visible part: resizing it changes how large the image is drawn,
//! moving it changes which part shows through.

use super::Control;
use super::handles::HandleKind;
use super::overlay::{Overlay, OverlayFrame};
use crate::classes;
use crate::config::PluginConfig;
use crate::dom::Document;
use crate::editable::EditableImage;
use crate::error::Result;
use crate::events::ImageEvent;
use crate::geometry::{normalize, rotate_point, transpose};
use crate::input::{DragState, PointerEvent};
use kurbo::Point;

/// What a crop drag holds on to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropGrip {
    Handle(HandleKind),
    /// The overlay body: moves the image under the visible box.
    Body,
}

#[derive(Debug)]
pub struct CropControl {
    handle_size: f64,
    min_size: f64,
    overlay: Option<Overlay>,
    frame: Option<OverlayFrame>,
    drag: Option<DragState<CropGrip>>,
}

impl CropControl {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            handle_size: config.handle_size,
            min_size: config.min_size,
            overlay: None,
            frame: None,
            drag: None,
        }
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Current overlay geometry, including a drag in progress.
    pub fn frame(&self) -> Option<OverlayFrame> {
        let frame = self.frame?;
        Some(match &self.drag {
            Some(drag) => self.dragged(frame, drag),
            None => frame,
        })
    }

    fn dragged(&self, frame: OverlayFrame, drag: &DragState<CropGrip>) -> OverlayFrame {
        match drag.grip {
            CropGrip::Handle(kind) => frame.resized(kind, drag.delta(), false, self.min_size),
            CropGrip::Body => frame.translated(drag.delta()),
        }
    }

    /// Overlay geometry of the full image rectangle.
    fn frame_for(doc: &Document, image: &EditableImage) -> OverlayFrame {
        let original = image.original_size();
        let local_center = image.original_offset() + original.to_vec2() / 2.0;
        let size = if image.orientation().is_sideways() {
            transpose(original)
        } else {
            original
        };
        OverlayFrame::new(
            image.local_to_screen(doc, local_center),
            size,
            image.residual_rotation(),
        )
    }

    /// Crop offset implied by `frame`: the screen corner holding the
    /// image's top-left, taken relative to the coordinate helper and turned
    /// back into the image's unrotated space.
    fn offset_for(doc: &Document, image: &EditableImage, frame: &OverlayFrame) -> Point {
        let corner = frame.corner(image.orientation().crop_anchor());
        let relative = normalize(corner, image.reference_point(doc));
        rotate_point(relative, -f64::from(image.rotation()))
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

impl Control for CropControl {
    fn enable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        if self.overlay.is_some() {
            return Ok(());
        }
        self.overlay = Some(Overlay::create(doc, image, classes::CROP_OVERLAY)?);
        log::debug!("Crop control enabled on {:?}", image.target());
        self.realign(doc, image)
    }

    fn disable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        self.drag = None;
        self.frame = None;
        if let Some(overlay) = self.overlay.take() {
            overlay.remove(doc, image)?;
            log::debug!("Crop control disabled on {:?}", image.target());
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
                let grip = match target {
                    Some(node) => overlay
                        .handle_for(node)
                        .map(CropGrip::Handle)
                        .or((node == overlay.node()).then_some(CropGrip::Body)),
                    None => frame
                        .hit_test(position, self.handle_size)
                        .map(CropGrip::Handle)
                        .or(frame.contains(position).then_some(CropGrip::Body)),
                };
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
                let result = self.dragged(frame, &drag);
                let offset = Self::offset_for(doc, image, &result);
                if let CropGrip::Handle(_) = drag.grip {
                    let size = if image.orientation().is_sideways() {
                        transpose(result.size)
                    } else {
                        result.size
                    };
                    image.set_original_img_size(doc, size)?;
                }
                log::debug!("Crop ended: offset ({}, {})", offset.x, offset.y);
                image.set_original_img_offset(doc, offset)?;
                image.recalculate_wrapper(doc)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::handles::Corner;
    use kurbo::{Size, Vec2};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn setup(rotation: f64) -> (Document, EditableImage, CropControl) {
        let mut doc = Document::from_html("<img src=\"a.png\" width=\"100\" height=\"50\">").unwrap();
        let img = doc.find_by_tag(doc.root(), "img")[0];
        let mut image = EditableImage::attach(&mut doc, img).unwrap();
        image.set_rotation(&mut doc, rotation).unwrap();
        image.recalculate_wrapper(&mut doc).unwrap();
        image.take_events();
        let mut control = CropControl::new(&PluginConfig::default());
        control.enable(&mut doc, &image).unwrap();
        (doc, image, control)
    }

    fn drag_body(doc: &mut Document, image: &mut EditableImage, control: &mut CropControl, by: Vec2) {
        let overlay = control.overlay().unwrap().node();
        let start = control.frame().unwrap().center;
        let down = PointerEvent::Down { position: start, target: Some(overlay) };
        assert!(control.handle_pointer(doc, image, &down).unwrap());
        let up = PointerEvent::Up { position: start + by };
        control.handle_pointer(doc, image, &up).unwrap();
    }

    #[test]
    fn test_overlay_covers_image() {
        let (_, _, control) = setup(0.0);
        let frame = control.frame().unwrap();
        assert_eq!(frame.size, Size::new(100.0, 50.0));
        assert!(approx(frame.center.x, 50.0) && approx(frame.center.y, 25.0));
    }

    #[test]
    fn test_body_drag_moves_offset() {
        let (mut doc, mut image, mut control) = setup(0.0);
        drag_body(&mut doc, &mut image, &mut control, Vec2::new(10.0, -5.0));
        let offset = image.original_offset();
        assert!(approx(offset.x, 10.0) && approx(offset.y, -5.0));
        assert_eq!(image.original_size(), Size::new(100.0, 50.0));
    }

    #[test]
    fn test_body_drag_on_rotated_image() {
        // At 90 degrees, moving right on screen moves up in image space.
        let (mut doc, mut image, mut control) = setup(90.0);
        assert_eq!(control.frame().unwrap().size, Size::new(50.0, 100.0));
        drag_body(&mut doc, &mut image, &mut control, Vec2::new(10.0, 0.0));
        let offset = image.original_offset();
        assert!(approx(offset.x, 0.0) && approx(offset.y, -10.0), "{offset:?}");
    }

    #[test]
    fn test_every_orientation_keeps_offset_on_null_drag() {
        for angle in [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0] {
            let (mut doc, mut image, mut control) = setup(angle);
            image.set_original_img_offset(&mut doc, Point::new(-7.0, 3.0)).unwrap();
            for event in image.take_events() {
                control.on_image_event(&mut doc, &image, event).unwrap();
            }
            drag_body(&mut doc, &mut image, &mut control, Vec2::ZERO);
            let offset = image.original_offset();
            assert!(approx(offset.x, -7.0) && approx(offset.y, 3.0), "{angle}: {offset:?}");
        }
    }

    #[test]
    fn test_handle_drag_resizes_crop() {
        let (mut doc, mut image, mut control) = setup(0.0);
        let frame = control.frame().unwrap();
        let corner = frame.corner(Corner::TopLeft);
        let down = PointerEvent::Down { position: corner, target: None };
        assert!(control.handle_pointer(&mut doc, &mut image, &down).unwrap());
        let up = PointerEvent::Up { position: corner + Vec2::new(-20.0, -10.0) };
        control.handle_pointer(&mut doc, &mut image, &up).unwrap();

        assert!(approx(image.original_size().width, 120.0));
        assert!(approx(image.original_size().height, 60.0));
        let offset = image.original_offset();
        assert!(approx(offset.x, -20.0) && approx(offset.y, -10.0));
        // The visible box is unchanged.
        assert_eq!(image.size(), Size::new(100.0, 50.0));
    }

    #[test]
    fn test_click_outside_is_ignored() {
        let (mut doc, mut image, mut control) = setup(0.0);
        let down = PointerEvent::Down { position: Point::new(500.0, 500.0), target: None };
        assert!(!control.handle_pointer(&mut doc, &mut image, &down).unwrap());
    }
}
