//! Clean editor HTML before it is saved.

use crate::classes;
use crate::dom::{Document, NodeId};
use crate::error::Result;

/// Strip every editing artefact from `html`.
///
/// Control nodes go away with their subtrees; wrappers lose their
/// editing-only attributes and classes but keep the wrapper, orientation
/// and rotation classes that make up the saved form of a transformed image.
pub fn clean_html(html: &str) -> Result<String> {
    let mut doc = Document::from_html(html)?;
    let root = doc.root();
    clean_subtree(&mut doc, root)?;
    Ok(doc.inner_html(root))
}

/// Clean the children of `scope` in place.
pub fn clean_subtree(doc: &mut Document, scope: NodeId) -> Result<()> {
    for control in doc.find_by_class(scope, classes::CONTROL) {
        // Nested controls already left with their ancestor.
        if doc.contains(scope, control) && doc.parent(control).is_some() {
            doc.remove(control)?;
        }
    }
    for wrapper in doc.find_by_class(scope, classes::WRAPPER) {
        doc.remove_attribute(wrapper, "contenteditable")?;
        doc.remove_class(wrapper, classes::ACTIVE)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITING: &str = concat!(
        "<p>before</p>",
        "<div class=\"imageframe-wrapper orientation-t imageframe-active\" contenteditable=\"true\">",
        "<div class=\"imageframe-inner rot-deg-15\">",
        "<img src=\"a.png\" style=\"width: 100px; height: 50px\">",
        "<span class=\"imageframe-control imageframe-coords\"></span>",
        "</div>",
        "<div class=\"imageframe-control imageframe-resize rot-deg-15\"><span class=\"imageframe-control imageframe-handle\"></span></div>",
        "<span class=\"imageframe-control imageframe-rotate-handle rot-deg-15\"></span>",
        "</div>",
    );

    #[test]
    fn test_controls_are_stripped() {
        let cleaned = clean_html(EDITING).unwrap();
        let doc = Document::from_html(&cleaned).unwrap();
        let root = doc.root();

        assert_eq!(doc.find_by_tag(root, "img").len(), 1);
        assert!(doc.find_by_class(root, classes::CONTROL).is_empty());
        let inner = doc.find_by_class(root, classes::INNER_WRAPPER);
        assert_eq!(inner.len(), 1);
        assert!(doc.has_class(inner[0], "rot-deg-15"));
    }

    #[test]
    fn test_wrapper_loses_editing_state() {
        let cleaned = clean_html(EDITING).unwrap();
        assert_eq!(
            cleaned,
            concat!(
                "<p>before</p>",
                "<div class=\"imageframe-wrapper orientation-t\">",
                "<div class=\"imageframe-inner rot-deg-15\">",
                "<img src=\"a.png\" style=\"width: 100px; height: 50px\">",
                "</div></div>",
            )
        );
    }

    #[test]
    fn test_plain_html_is_untouched() {
        let html = "<p>text <img src=\"a.png\" width=\"10\" height=\"10\"></p>";
        assert_eq!(clean_html(html).unwrap(), html);
    }

    #[test]
    fn test_character_references_survive_cleaning() {
        let cleaned = clean_html("<p>&copy; 2024 &#8217;quoted&#8217; &mdash; x &amp; y</p>").unwrap();
        assert_eq!(cleaned, "<p>\u{a9} 2024 \u{2019}quoted\u{2019} \u{2014} x &amp; y</p>");
        assert_eq!(clean_html(&cleaned).unwrap(), cleaned);
    }
}
