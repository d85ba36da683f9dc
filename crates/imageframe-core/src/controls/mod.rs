//! Direct-manipulation controls attached to an editable image.
//!
//! Controls do not own the image. The session hands it to them on every
//! call, so tearing the session down releases everything at once.

mod crop;
mod handles;
mod overlay;
mod resize;
mod rotate;

pub use crop::CropControl;
pub use handles::{Corner, Edge, Handle, HandleKind, RESIZE_HANDLES};
pub use overlay::{Overlay, OverlayFrame};
pub use resize::ResizeControl;
pub use rotate::RotateControl;

use crate::dom::Document;
use crate::editable::EditableImage;
use crate::error::Result;
use crate::events::ImageEvent;
use crate::input::PointerEvent;

/// Common interface of the resize, rotate and crop controls.
pub trait Control {
    /// Add the control's nodes to the scaffold.
    fn enable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()>;

    /// Remove the control's nodes and drop any drag in progress.
    fn disable(&mut self, doc: &mut Document, image: &EditableImage) -> Result<()>;

    fn is_enabled(&self) -> bool;

    fn is_dragging(&self) -> bool;

    /// React to a model event, typically by re-aligning.
    fn on_image_event(&mut self, doc: &mut Document, image: &EditableImage, event: ImageEvent) -> Result<()>;

    /// Handle a pointer event. Returns true when the event was consumed.
    fn handle_pointer(&mut self, doc: &mut Document, image: &mut EditableImage, event: &PointerEvent) -> Result<bool>;
}
