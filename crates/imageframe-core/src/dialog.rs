//! Insert/edit image form.
//!
//! Rendering the dialog is the host's business; this is the state behind
//! it: the typed values, their validation and the markup they produce.

use crate::dom::escape_attribute;
use crate::geometry::natural_aspect_ratio;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// A width or height as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Pixels(u32),
    Percent(u32),
}

impl Dimension {
    fn to_attribute(self) -> String {
        match self {
            Dimension::Pixels(px) => px.to_string(),
            Dimension::Percent(pct) => format!("{pct}%"),
        }
    }
}

/// Parse a dimension field: whole pixels (`120`) or a percentage (`50%`).
pub fn parse_dimension(text: &str) -> Option<Dimension> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(pct) => pct.trim().parse().ok().map(Dimension::Percent),
        None => text.parse().ok().map(Dimension::Pixels),
    }
}

/// Form fields the dialog can move focus to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormField {
    Url,
    Alt,
    Width,
    Height,
}

/// A problem that keeps the form from being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormIssue {
    MissingUrl,
    /// No alt text and the image is not marked decorative.
    MissingAlt,
    InvalidWidth,
    InvalidHeight,
}

impl FormIssue {
    /// Field to focus so the user can fix the issue.
    pub fn field(self) -> FormField {
        match self {
            FormIssue::MissingUrl => FormField::Url,
            FormIssue::MissingAlt => FormField::Alt,
            FormIssue::InvalidWidth => FormField::Width,
            FormIssue::InvalidHeight => FormField::Height,
        }
    }

    /// Inline warning shown next to the field.
    pub fn message(self) -> &'static str {
        match self {
            FormIssue::MissingUrl => "Enter the image URL.",
            FormIssue::MissingAlt => "Describe the image, or mark it as decorative.",
            FormIssue::InvalidWidth => "Width must be a whole number of pixels or a percentage.",
            FormIssue::InvalidHeight => "Height must be a whole number of pixels or a percentage.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageForm {
    pub url: String,
    pub alt: String,
    /// Decorative images need no alt text and are hidden from screen readers.
    pub decorative: bool,
    pub width: String,
    pub height: String,
    /// Keep width and height in the image's natural proportions.
    pub constrain: bool,
    /// Intrinsic size of the image, once known.
    pub natural_size: Option<Size>,
}

impl ImageForm {
    /// Prefill from an image's natural size.
    pub fn for_image(url: &str, natural_size: Size) -> Self {
        Self {
            url: url.to_string(),
            width: format!("{}", natural_size.width.round() as u32),
            height: format!("{}", natural_size.height.round() as u32),
            constrain: true,
            natural_size: Some(natural_size),
            ..Self::default()
        }
    }

    /// Every issue blocking the form, in field order. Empty dimension
    /// fields are allowed and simply omitted from the markup.
    pub fn validate(&self) -> Vec<FormIssue> {
        let mut issues = Vec::new();
        if self.url.trim().is_empty() {
            issues.push(FormIssue::MissingUrl);
        }
        if !self.decorative && self.alt.trim().is_empty() {
            issues.push(FormIssue::MissingAlt);
        }
        if !self.width.trim().is_empty() && parse_dimension(&self.width).is_none() {
            issues.push(FormIssue::InvalidWidth);
        }
        if !self.height.trim().is_empty() && parse_dimension(&self.height).is_none() {
            issues.push(FormIssue::InvalidHeight);
        }
        issues
    }

    /// Field that should receive focus, if the form cannot be applied.
    pub fn focus_field(&self) -> Option<FormField> {
        self.validate().first().map(|issue| issue.field())
    }

    /// After `changed` was edited, recompute the other dimension from the
    /// natural aspect ratio. Does nothing unless proportions are constrained
    /// and the edited value parses.
    pub fn sync_dimensions(&mut self, changed: FormField) {
        if !self.constrain {
            return;
        }
        let Some(natural) = self.natural_size else {
            return;
        };
        let ratio = natural_aspect_ratio(natural);
        match changed {
            FormField::Width => {
                let Some(width) = parse_dimension(&self.width) else {
                    return;
                };
                self.height = match width {
                    Dimension::Pixels(px) => format!("{}", (f64::from(px) / ratio).round() as u32),
                    Dimension::Percent(pct) => format!("{pct}%"),
                };
            }
            FormField::Height => {
                let Some(height) = parse_dimension(&self.height) else {
                    return;
                };
                self.width = match height {
                    Dimension::Pixels(px) => format!("{}", (f64::from(px) * ratio).round() as u32),
                    Dimension::Percent(pct) => format!("{pct}%"),
                };
            }
            FormField::Url | FormField::Alt => {}
        }
    }

    /// Markup for the image, or the issues preventing it.
    pub fn to_html(&self) -> Result<String, Vec<FormIssue>> {
        let issues = self.validate();
        if !issues.is_empty() {
            return Err(issues);
        }
        let alt = if self.decorative { "" } else { self.alt.trim() };
        let mut html = format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_attribute(self.url.trim()),
            escape_attribute(alt)
        );
        for (name, value) in [("width", &self.width), ("height", &self.height)] {
            if let Some(dimension) = parse_dimension(value) {
                html.push_str(&format!(" {name}=\"{}\"", dimension.to_attribute()));
            }
        }
        if self.decorative {
            html.push_str(" role=\"presentation\"");
        }
        html.push('>');
        Ok(html)
    }
}
