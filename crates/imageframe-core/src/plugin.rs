//! Editor integration.
//!
//! [`ImagePlugin`] is what a host editor talks to. It owns at most one
//! [`ImageSession`], routes editor events to it and keeps the saved HTML
//! free of editing artefacts.

use crate::classes;
use crate::clean;
use crate::config::PluginConfig;
use crate::dialog::ImageForm;
use crate::dom::{Document, NodeId, Range};
use crate::editable::image_in_wrapper;
use crate::error::{Error, Result};
use crate::input::PointerEvent;
use crate::session::ImageSession;
use crate::upload::{UploadRequest, UploadResolution, UploadTransport, upload_dropped_file};

/// A toolbar button the plugin asks the host to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarButton {
    pub name: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
}

/// The button opening the insert/edit image dialog.
pub const IMAGE_BUTTON: ToolbarButton = ToolbarButton {
    name: "imageframe",
    icon: "e/insert_edit_image",
    title: "Insert or edit image",
};

/// What the host environment can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Structural changes can be observed. Without it deletions go unseen
    /// and images cannot be edited in place.
    pub mutation_observer: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            mutation_observer: true,
        }
    }
}

/// The editor hosting the plugin.
pub trait EditorHost {
    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn selection(&self) -> Option<Range> {
        self.document().selection().copied()
    }

    fn set_selection(&mut self, range: Option<Range>) {
        self.document_mut().set_selection(range);
    }

    fn selection_from_node(&mut self, node: NodeId) -> Result<()> {
        self.document_mut().select_node(node)
    }

    fn insert_content_at_focus_point(&mut self, html: &str) -> Result<Vec<NodeId>> {
        self.document_mut().insert_html_at_selection(html)
    }

    fn can_show_filepicker(&self, _kind: &str) -> bool {
        false
    }

    fn show_filepicker(&mut self, kind: &str) -> Result<()> {
        Err(Error::Unsupported(format!("no {kind} file picker")))
    }

    fn register_button(&mut self, button: ToolbarButton);

    /// Tell the user something went wrong.
    fn alert(&mut self, message: &str);
}

/// Input the host forwards to the plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Click(NodeId),
    DoubleClick(NodeId),
    Pointer(PointerEvent),
    /// The host's selection moved.
    SelectionChanged,
    /// Queued mutation records are ready for delivery.
    MutationCheckpoint,
}

#[derive(Debug)]
pub struct ImagePlugin {
    config: PluginConfig,
    supported: bool,
    registered: bool,
    session: Option<ImageSession>,
}

impl ImagePlugin {
    pub fn new(config: PluginConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            supported: true,
            registered: false,
            session: None,
        })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Whether images can be edited in place. When false the plugin only
    /// inserts images.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn session(&self) -> Option<&ImageSession> {
        self.session.as_ref()
    }

    /// Hook the plugin into `host`. Safe to call more than once.
    pub fn register<H: EditorHost + ?Sized>(&mut self, host: &mut H) {
        if self.registered {
            return;
        }
        self.supported = host.capabilities().mutation_observer;
        if !self.supported {
            log::warn!("Mutation observation unavailable, image editing is view-only");
        }
        host.register_button(IMAGE_BUTTON);
        self.registered = true;
        log::info!("Image plugin registered");
    }

    /// Feed one editor event. Returns true if the plugin consumed it.
    pub fn handle_event<H: EditorHost + ?Sized>(&mut self, host: &mut H, event: &EditorEvent) -> Result<bool> {
        match *event {
            EditorEvent::Click(node) => self.click(host, node, false),
            EditorEvent::DoubleClick(node) => self.click(host, node, true),
            EditorEvent::Pointer(ref pointer) => match self.session.as_mut() {
                Some(session) => session.handle_pointer(host.document_mut(), pointer),
                None => Ok(false),
            },
            EditorEvent::SelectionChanged => {
                let Some(wrapper) = self.session.as_ref().map(ImageSession::wrapper) else {
                    return Ok(false);
                };
                let keep = host
                    .selection()
                    .is_some_and(|range| host.document().range_touches(&range, wrapper));
                if !keep {
                    self.deselect(host)?;
                }
                Ok(false)
            }
            EditorEvent::MutationCheckpoint => self.flush_mutations(host),
        }
    }

    fn click<H: EditorHost + ?Sized>(&mut self, host: &mut H, node: NodeId, double: bool) -> Result<bool> {
        if let Some(session) = self.session.as_mut() {
            if session.handle_click(host.document_mut(), node, double)? {
                return Ok(true);
            }
        }
        match self.image_at(host.document(), node)? {
            Some(image) => {
                self.select_image(host, image)?;
                Ok(true)
            }
            None => {
                self.deselect(host)?;
                Ok(false)
            }
        }
    }

    /// The image a click on `node` refers to, if any.
    fn image_at(&self, doc: &Document, node: NodeId) -> Result<Option<NodeId>> {
        if doc.tag(node) == Some("img") {
            return Ok(Some(node));
        }
        match doc.closest_with_class(node, classes::WRAPPER) {
            Some(wrapper) => image_in_wrapper(doc, wrapper).map(Some),
            None => Ok(None),
        }
    }

    /// Start editing `target`. The previous session is fully ended, and its
    /// scaffold gone, before the new one is built.
    pub fn select_image<H: EditorHost + ?Sized>(&mut self, host: &mut H, target: NodeId) -> Result<()> {
        if self.session.as_ref().is_some_and(|s| s.target() == target) {
            return Ok(());
        }
        self.deselect(host)?;
        if !self.supported {
            log::debug!("Ignoring selection of {:?}: editing unsupported", target);
            return Ok(());
        }
        let session = ImageSession::start(host.document_mut(), target, &self.config)?;
        host.selection_from_node(session.wrapper())?;
        self.session = Some(session);
        Ok(())
    }

    /// End the current session, if any.
    pub fn deselect<H: EditorHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            session.end(host.document_mut())?;
        }
        Ok(())
    }

    /// Deliver queued mutation records. Returns true if the edited image
    /// went away.
    pub fn flush_mutations<H: EditorHost + ?Sized>(&mut self, host: &mut H) -> Result<bool> {
        let doc = host.document_mut();
        let batches = doc.take_mutation_batches();
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        let deleted = session.handle_mutations(doc, &batches)?;
        if !deleted && doc.is_connected(session.wrapper()) {
            return Ok(false);
        }
        if !deleted {
            log::debug!("Scaffold of {:?} removed from the document", session.target());
            session.end(doc)?;
        }
        self.session = None;
        Ok(true)
    }

    /// Strip editing artefacts from `html`.
    pub fn clean_html(&self, html: &str) -> Result<String> {
        clean::clean_html(html)
    }

    /// End editing and return the document's content as it should be saved.
    pub fn prepare_for_save<H: EditorHost + ?Sized>(&mut self, host: &mut H) -> Result<String> {
        self.deselect(host)?;
        let doc = host.document();
        clean::clean_html(&doc.inner_html(doc.root()))
    }

    /// Insert a new image from the dialog at the focus point.
    pub fn insert_image<H: EditorHost + ?Sized>(&mut self, host: &mut H, form: &ImageForm) -> Result<NodeId> {
        let html = form.to_html().map_err(Error::InvalidForm)?;
        self.deselect(host)?;
        host.insert_content_at_focus_point(&html)?
            .into_iter()
            .find(|&node| host.document().tag(node) == Some("img"))
            .ok_or_else(|| Error::Parse {
                offset: 0,
                message: "dialog markup produced no image".to_string(),
            })
    }

    /// Apply the dialog to an existing image. Size attributes are only
    /// written to plain images; a transformed one keeps its scaffold size.
    pub fn update_image<H: EditorHost + ?Sized>(&mut self, host: &mut H, target: NodeId, form: &ImageForm) -> Result<()> {
        let html = form.to_html().map_err(Error::InvalidForm)?;
        self.deselect(host)?;
        let doc = host.document_mut();
        if doc.tag(target) != Some("img") {
            return Err(Error::NotAnImage(target));
        }
        let scratch = Document::from_html(&html)?;
        let source = scratch
            .find_by_tag(scratch.root(), "img")
            .first()
            .copied()
            .ok_or(Error::NotAnImage(target))?;
        let wrapped = doc.closest_with_class(target, classes::WRAPPER).is_some();
        for name in ["src", "alt", "role", "width", "height"] {
            if wrapped && (name == "width" || name == "height") {
                continue;
            }
            match scratch.attribute(source, name) {
                Some(value) => doc.set_attribute(target, name, value)?,
                None => doc.remove_attribute(target, name)?,
            }
        }
        Ok(())
    }

    /// Upload a dropped file and put it at the caret. Failures are reported
    /// through the host's alert and leave the document as it was.
    pub async fn handle_drop<H, T>(&mut self, host: &mut H, transport: &T, request: &UploadRequest) -> Result<UploadResolution>
    where
        H: EditorHost + ?Sized,
        T: UploadTransport + ?Sized,
    {
        self.deselect(host)?;
        let resolution = upload_dropped_file(transport, host.document_mut(), request).await?;
        if let UploadResolution::Failed(message) = &resolution {
            host.alert(message);
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ObserveOptions;
    use crate::upload::{BoxFuture, UploadResponse};
    use crate::session::Mode;
    use kurbo::{Point, Size};

    #[derive(Default)]
    struct TestHost {
        doc: Document,
        capabilities: Capabilities,
        buttons: Vec<ToolbarButton>,
        alerts: Vec<String>,
    }

    impl TestHost {
        fn with_html(html: &str) -> Self {
            Self {
                doc: Document::from_html(html).unwrap(),
                ..Self::default()
            }
        }

        fn images(&self) -> Vec<NodeId> {
            self.doc.find_by_tag(self.doc.root(), "img")
        }
    }

    impl EditorHost for TestHost {
        fn document(&self) -> &Document {
            &self.doc
        }

        fn document_mut(&mut self) -> &mut Document {
            &mut self.doc
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn register_button(&mut self, button: ToolbarButton) {
            self.buttons.push(button);
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    fn plugin(host: &mut TestHost) -> ImagePlugin {
        let mut plugin = ImagePlugin::new(PluginConfig::default()).unwrap();
        plugin.register(host);
        plugin
    }

    const TWO_IMAGES: &str = "<p><img src=\"a.png\" width=\"100\" height=\"50\"></p><p><img src=\"b.png\" width=\"40\" height=\"40\"></p>";

    #[test]
    fn test_register_adds_button_once() {
        let mut host = TestHost::default();
        let mut plugin = plugin(&mut host);
        plugin.register(&mut host);
        assert_eq!(host.buttons, vec![IMAGE_BUTTON]);
        assert!(plugin.is_supported());
    }

    #[test]
    fn test_without_mutation_observer_is_view_only() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        host.capabilities.mutation_observer = false;
        let mut plugin = plugin(&mut host);
        assert!(!plugin.is_supported());

        let img = host.images()[0];
        plugin.handle_event(&mut host, &EditorEvent::Click(img)).unwrap();
        assert!(plugin.session().is_none());
        assert!(host.doc.find_by_class(host.doc.root(), classes::WRAPPER).is_empty());
    }

    #[test]
    fn test_click_selects_image() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        assert!(plugin.handle_event(&mut host, &EditorEvent::Click(img)).unwrap());

        let session = plugin.session().unwrap();
        assert_eq!(session.target(), img);
        let range = host.selection().unwrap();
        assert!(host.doc.range_touches(&range, session.wrapper()));
    }

    #[test]
    fn test_selecting_another_image_tears_down_first() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let images = host.images();
        plugin.select_image(&mut host, images[0]).unwrap();
        let first_wrapper = plugin.session().unwrap().wrapper();

        let root = host.doc.root();
        let observer = host.doc.observe(root, ObserveOptions::subtree());
        plugin.select_image(&mut host, images[1]).unwrap();
        let second_wrapper = plugin.session().unwrap().wrapper();

        let records: Vec<_> = host
            .doc
            .take_mutation_batches()
            .into_iter()
            .filter(|batch| batch.observer == observer)
            .flat_map(|batch| batch.records)
            .collect();
        let removed_first = records
            .iter()
            .position(|r| r.removed.contains(&first_wrapper))
            .unwrap();
        let added_second = records
            .iter()
            .position(|r| r.added.contains(&second_wrapper))
            .unwrap();
        assert!(removed_first < added_second);
        assert_eq!(host.doc.parent(images[0]), Some(host.doc.children(root)[0]));
        assert_eq!(host.doc.find_by_class(root, classes::WRAPPER), vec![second_wrapper]);
    }

    #[test]
    fn test_click_elsewhere_deselects() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        let paragraph = host.doc.children(host.doc.root())[1];
        assert!(!plugin.handle_event(&mut host, &EditorEvent::Click(paragraph)).unwrap());
        assert!(plugin.session().is_none());
        assert!(host.doc.find_by_class(host.doc.root(), classes::WRAPPER).is_empty());
    }

    #[test]
    fn test_selection_moving_away_deselects() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        plugin.handle_event(&mut host, &EditorEvent::SelectionChanged).unwrap();
        assert!(plugin.session().is_some());

        let paragraph = host.doc.children(host.doc.root())[1];
        host.set_selection(Some(Range::collapsed(paragraph, 0)));
        plugin.handle_event(&mut host, &EditorEvent::SelectionChanged).unwrap();
        assert!(plugin.session().is_none());
    }

    #[test]
    fn test_crop_toggle_keeps_session_selected() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        assert!(plugin.handle_event(&mut host, &EditorEvent::DoubleClick(img)).unwrap());
        assert_eq!(plugin.session().map(ImageSession::mode), Some(Mode::Crop));
        assert!(host.selection().is_some());

        plugin.handle_event(&mut host, &EditorEvent::SelectionChanged).unwrap();
        let session = plugin.session().unwrap();
        assert_eq!(session.mode(), Mode::Crop);
        assert!(session.crop().is_some());

        plugin.handle_event(&mut host, &EditorEvent::DoubleClick(img)).unwrap();
        plugin.handle_event(&mut host, &EditorEvent::SelectionChanged).unwrap();
        assert_eq!(plugin.session().map(ImageSession::mode), Some(Mode::Transform));
    }

    #[test]
    fn test_deleting_edited_image_ends_session() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        host.doc.remove(img).unwrap();
        assert!(plugin.handle_event(&mut host, &EditorEvent::MutationCheckpoint).unwrap());
        assert!(plugin.session().is_none());
        assert_eq!(host.doc.inner_html(host.doc.root()), "<p></p><p><img src=\"b.png\" width=\"40\" height=\"40\"></p>");
    }

    #[test]
    fn test_deleting_whole_wrapper_ends_session() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        let wrapper = plugin.session().unwrap().wrapper();
        host.doc.remove(wrapper).unwrap();
        assert!(plugin.flush_mutations(&mut host).unwrap());
        assert!(plugin.session().is_none());
        assert_eq!(host.doc.observer_count(), 0);
    }

    #[test]
    fn test_click_inside_saved_scaffold_reopens_it() {
        let html = "<div class=\"imageframe-wrapper orientation-t\"><div class=\"imageframe-inner rot-deg-10\" style=\"width: 60px; height: 30px\"><img src=\"a.png\" style=\"width: 60px; height: 30px\"></div></div>";
        let mut host = TestHost::with_html(html);
        let mut plugin = plugin(&mut host);
        let wrapper = host.doc.children(host.doc.root())[0];
        plugin.handle_event(&mut host, &EditorEvent::Click(wrapper)).unwrap();

        let session = plugin.session().unwrap();
        assert_eq!(session.wrapper(), wrapper);
        assert_eq!(session.image().rotation(), 10);
        assert_eq!(session.image().size(), Size::new(60.0, 30.0));
    }

    #[test]
    fn test_broken_scaffold_is_reported() {
        let mut host = TestHost::with_html("<div class=\"imageframe-wrapper\"><span>x</span></div>");
        let mut plugin = plugin(&mut host);
        let span = host.doc.find_by_tag(host.doc.root(), "span")[0];
        assert!(matches!(
            plugin.handle_event(&mut host, &EditorEvent::Click(span)),
            Err(Error::MissingScaffold(_))
        ));
    }

    #[test]
    fn test_prepare_for_save_ends_session() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        let saved = plugin.prepare_for_save(&mut host).unwrap();
        assert_eq!(saved, TWO_IMAGES);
        assert!(plugin.session().is_none());
    }

    #[test]
    fn test_pointer_events_reach_session() {
        let mut host = TestHost::with_html(TWO_IMAGES);
        let mut plugin = plugin(&mut host);
        let img = host.images()[0];
        plugin.select_image(&mut host, img).unwrap();

        let far = EditorEvent::Pointer(PointerEvent::Down {
            position: Point::new(5000.0, 5000.0),
            target: None,
        });
        assert!(!plugin.handle_event(&mut host, &far).unwrap());

        let handle = plugin.session().and_then(|s| s.rotate()).and_then(|r| r.node()).unwrap();
        let grab = EditorEvent::Pointer(PointerEvent::Down {
            position: Point::ZERO,
            target: Some(handle),
        });
        assert!(plugin.handle_event(&mut host, &grab).unwrap());
    }

    #[test]
    fn test_insert_image_from_form() {
        let mut host = TestHost::with_html("<p>text</p>");
        let mut plugin = plugin(&mut host);
        let form = ImageForm {
            url: "c.png".into(),
            alt: "C".into(),
            width: "20".into(),
            height: "10".into(),
            ..ImageForm::default()
        };
        let img = plugin.insert_image(&mut host, &form).unwrap();
        assert_eq!(host.doc.attribute(img, "src"), Some("c.png"));
        assert_eq!(host.doc.attribute(img, "width"), Some("20"));

        let incomplete = ImageForm::default();
        assert!(matches!(
            plugin.insert_image(&mut host, &incomplete),
            Err(Error::InvalidForm(_))
        ));
    }

    #[test]
    fn test_update_image_keeps_scaffold_size() {
        let html = "<div class=\"imageframe-wrapper\"><div class=\"imageframe-inner rot-deg-30\"><img src=\"a.png\" alt=\"old\"></div></div><img src=\"b.png\" width=\"5\" height=\"5\">";
        let mut host = TestHost::with_html(html);
        let mut plugin = plugin(&mut host);
        let images = host.images();
        let form = ImageForm {
            url: "new.png".into(),
            decorative: true,
            width: "80".into(),
            height: "40".into(),
            ..ImageForm::default()
        };

        plugin.update_image(&mut host, images[0], &form).unwrap();
        assert_eq!(host.doc.attribute(images[0], "src"), Some("new.png"));
        assert_eq!(host.doc.attribute(images[0], "role"), Some("presentation"));
        assert_eq!(host.doc.attribute(images[0], "width"), None);

        plugin.update_image(&mut host, images[1], &form).unwrap();
        assert_eq!(host.doc.attribute(images[1], "width"), Some("80"));
    }

    struct FailingTransport;

    impl UploadTransport for FailingTransport {
        fn upload<'a>(&'a self, _request: &'a UploadRequest) -> BoxFuture<'a, Result<UploadResponse>> {
            Box::pin(async { UploadResponse::parse(r#"{"error":"Quota exceeded"}"#) })
        }
    }

    #[test]
    fn test_failed_drop_alerts_user() {
        let mut host = TestHost::with_html("<p>x</p>");
        let mut plugin = plugin(&mut host);
        let request = UploadRequest::new("big.png", "image/png", vec![0; 8], plugin.config());
        let resolution = pollster::block_on(plugin.handle_drop(&mut host, &FailingTransport, &request)).unwrap();

        assert!(matches!(resolution, UploadResolution::Failed(_)));
        assert_eq!(host.alerts, vec!["Upload failed: Quota exceeded".to_string()]);
        assert_eq!(host.doc.inner_html(host.doc.root()), "<p>x</p>");
    }
}
