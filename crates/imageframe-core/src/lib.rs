//! ImageFrame Core Library
//!
//! In-editor resize, rotate and crop for inline images: the editable image
//! model and its scaffold, the direct-manipulation controls, deletion
//! tracking, save-time cleanup, the insert dialog and drag-and-drop upload.

pub mod classes;
pub mod clean;
pub mod config;
pub mod controls;
pub mod dialog;
pub mod dom;
pub mod editable;
pub mod error;
pub mod events;
pub mod geometry;
pub mod input;
pub mod orientation;
pub mod plugin;
pub mod session;
pub mod upload;
pub mod watcher;

pub use clean::clean_html;
pub use config::PluginConfig;
pub use controls::{Control, CropControl, ResizeControl, RotateControl};
pub use dialog::{Dimension, FormField, FormIssue, ImageForm};
pub use dom::{Document, NodeId, Range};
pub use editable::EditableImage;
pub use error::{Error, Result};
pub use events::{EventQueue, ImageEvent};
pub use input::PointerEvent;
pub use orientation::Orientation;
pub use plugin::{Capabilities, EditorEvent, EditorHost, ImagePlugin, ToolbarButton};
pub use session::{ImageSession, Mode};
pub use upload::{DropUpload, HttpUploadTransport, UploadRequest, UploadResolution, UploadResponse, UploadTransport};
pub use watcher::DeletionWatcher;
