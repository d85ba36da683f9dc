//! One editing session: an editable image plus its controls.

use crate::config::PluginConfig;
use crate::controls::{Control, CropControl, ResizeControl, RotateControl};
use crate::dom::{Document, MutationBatch, NodeId};
use crate::editable::EditableImage;
use crate::error::Result;
use crate::events::ImageEvent;
use crate::input::PointerEvent;

/// Which controls are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Resize overlay and rotate handle.
    #[default]
    Transform,
    /// Crop overlay only.
    Crop,
}

/// Editing state of the selected image.
///
/// Controls are created lazily the first time their mode is entered and are
/// torn down, in order, before the image itself is released.
#[derive(Debug)]
pub struct ImageSession {
    image: EditableImage,
    config: PluginConfig,
    mode: Mode,
    resize: Option<ResizeControl>,
    rotate: Option<RotateControl>,
    crop: Option<CropControl>,
    ended: bool,
}

impl ImageSession {
    /// Wrap and enable `target`, then show the transform controls.
    pub fn start(doc: &mut Document, target: NodeId, config: &PluginConfig) -> Result<Self> {
        let mut image = EditableImage::attach(doc, target)?;
        image.enable(doc)?;
        image.recalculate_wrapper(doc)?;

        let mut session = Self {
            image,
            config: config.clone(),
            mode: Mode::Transform,
            resize: None,
            rotate: None,
            crop: None,
            ended: false,
        };
        session.apply_mode(doc)?;
        session.pump_events(doc)?;
        log::debug!("Editing session started for {:?}", target);
        Ok(session)
    }

    pub fn image(&self) -> &EditableImage {
        &self.image
    }

    pub fn target(&self) -> NodeId {
        self.image.target()
    }

    pub fn wrapper(&self) -> NodeId {
        self.image.wrapper()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn resize(&self) -> Option<&ResizeControl> {
        self.resize.as_ref()
    }

    pub fn rotate(&self) -> Option<&RotateControl> {
        self.rotate.as_ref()
    }

    pub fn crop(&self) -> Option<&CropControl> {
        self.crop.as_ref()
    }

    /// Whether the session was ended or its image deleted.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn set_mode(&mut self, doc: &mut Document, mode: Mode) -> Result<()> {
        if self.ended || mode == self.mode {
            return Ok(());
        }
        self.mode = mode;
        log::debug!("Switching {:?} to {:?} mode", self.image.target(), mode);
        self.apply_mode(doc)?;
        // Swapping controls is a structural change, which drops the selection.
        doc.select_node(self.image.wrapper())?;
        self.pump_events(doc)
    }

    pub fn toggle_crop(&mut self, doc: &mut Document) -> Result<()> {
        let next = match self.mode {
            Mode::Transform => Mode::Crop,
            Mode::Crop => Mode::Transform,
        };
        self.set_mode(doc, next)
    }

    fn apply_mode(&mut self, doc: &mut Document) -> Result<()> {
        let image = &self.image;
        let (transform, crop) = match self.mode {
            Mode::Transform => (true, false),
            Mode::Crop => (false, true),
        };

        // Disable first so only one set of overlays is ever in the tree.
        if !transform {
            if let Some(resize) = self.resize.as_mut() {
                resize.disable(doc, image)?;
            }
            if let Some(rotate) = self.rotate.as_mut() {
                rotate.disable(doc, image)?;
            }
        }
        if !crop {
            if let Some(control) = self.crop.as_mut() {
                control.disable(doc, image)?;
            }
        }

        if transform && self.config.show_resize {
            self.resize
                .get_or_insert_with(|| ResizeControl::new(&self.config))
                .enable(doc, image)?;
        }
        if transform && self.config.show_rotate {
            self.rotate
                .get_or_insert_with(|| RotateControl::new(&self.config))
                .enable(doc, image)?;
        }
        if crop && self.config.show_crop {
            self.crop
                .get_or_insert_with(|| CropControl::new(&self.config))
                .enable(doc, image)?;
        }
        Ok(())
    }

    fn controls(&mut self) -> (&mut EditableImage, Vec<&mut dyn Control>) {
        let Self {
            image,
            resize,
            rotate,
            crop,
            ..
        } = self;
        let mut controls: Vec<&mut dyn Control> = Vec::with_capacity(3);
        if let Some(control) = rotate.as_mut() {
            controls.push(control);
        }
        if let Some(control) = resize.as_mut() {
            controls.push(control);
        }
        if let Some(control) = crop.as_mut() {
            controls.push(control);
        }
        (image, controls)
    }

    /// Forward the model's pending events to the controls until none are left.
    fn pump_events(&mut self, doc: &mut Document) -> Result<()> {
        loop {
            let events = self.image.take_events();
            if events.is_empty() {
                return Ok(());
            }
            for event in events {
                {
                    let (image, controls) = self.controls();
                    for control in controls {
                        control.on_image_event(doc, image, event)?;
                    }
                }
                match event {
                    ImageEvent::DoubleClick(_) => self.toggle_crop(doc)?,
                    ImageEvent::Delete => self.ended = true,
                    _ => {}
                }
            }
        }
    }

    /// Route a pointer event to the controls. A control that is dragging
    /// gets every event until the drag ends.
    pub fn handle_pointer(&mut self, doc: &mut Document, event: &PointerEvent) -> Result<bool> {
        if self.ended {
            return Ok(false);
        }
        let consumed = {
            let (image, controls) = self.controls();
            let dragging = controls.iter().position(|c| c.is_dragging());
            let mut consumed = false;
            for (index, control) in controls.into_iter().enumerate() {
                if dragging.is_some_and(|d| d != index) || !control.is_enabled() {
                    continue;
                }
                if control.handle_pointer(doc, image, event)? {
                    consumed = true;
                    break;
                }
            }
            consumed
        };
        self.pump_events(doc)?;
        Ok(consumed)
    }

    /// A click or double click somewhere in the document.
    pub fn handle_click(&mut self, doc: &mut Document, node: NodeId, double: bool) -> Result<bool> {
        if self.ended {
            return Ok(false);
        }
        let handled = self.image.handle_click(doc, node, double);
        self.pump_events(doc)?;
        Ok(handled)
    }

    /// Feed a mutation checkpoint. Returns true if the image was deleted.
    pub fn handle_mutations(&mut self, doc: &mut Document, batches: &[MutationBatch]) -> Result<bool> {
        if self.ended {
            return Ok(false);
        }
        if !self.image.handle_mutations(doc, batches)? {
            return Ok(false);
        }
        self.pump_events(doc)?;
        self.disable_controls(doc)?;
        self.ended = true;
        Ok(true)
    }

    fn disable_controls(&mut self, doc: &mut Document) -> Result<()> {
        let (image, controls) = self.controls();
        for control in controls {
            control.disable(doc, image)?;
        }
        Ok(())
    }

    /// Tear down: controls first, then the model and its scaffold.
    pub fn end(&mut self, doc: &mut Document) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.disable_controls(doc)?;
        self.image.release(doc)?;
        self.ended = true;
        log::debug!("Editing session ended for {:?}", self.image.target());
        Ok(())
    }
}
