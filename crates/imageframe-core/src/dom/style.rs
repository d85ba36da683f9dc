//! Inline style of an element.
//!
//! Only the properties the manipulation engine reads or writes are kept
//! structured; everything else is carried through untouched in `extra`.

use kurbo::{Insets, Point, Size};

/// Structured `style` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub left: Option<f64>,
    pub top: Option<f64>,
    /// Padding, `x0`/`y0`/`x1`/`y1` being left/top/right/bottom.
    pub padding: Insets,
    /// Border widths, same layout as `padding`.
    pub border: Insets,
    /// Unrecognised declarations, in source order.
    pub extra: Vec<(String, String)>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            left: None,
            top: None,
            padding: Insets::ZERO,
            border: Insets::ZERO,
            extra: Vec::new(),
        }
    }
}

impl Style {
    /// Parse the text of a `style` attribute.
    pub fn parse(text: &str) -> Self {
        let mut style = Self::default();
        for declaration in text.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() {
                continue;
            }
            if !style.apply(&property, value) {
                style.extra.push((property, value.to_string()));
            }
        }
        style
    }

    /// Apply one known declaration. Returns false when it is not understood.
    fn apply(&mut self, property: &str, value: &str) -> bool {
        match property {
            "width" => assign(&mut self.width, value),
            "height" => assign(&mut self.height, value),
            "left" => assign(&mut self.left, value),
            "top" => assign(&mut self.top, value),
            "padding" => parse_box(value).map(|insets| self.padding = insets).is_some(),
            "border-width" => parse_box(value).map(|insets| self.border = insets).is_some(),
            "padding-left" => parse_px(value).map(|v| self.padding.x0 = v).is_some(),
            "padding-top" => parse_px(value).map(|v| self.padding.y0 = v).is_some(),
            "padding-right" => parse_px(value).map(|v| self.padding.x1 = v).is_some(),
            "padding-bottom" => parse_px(value).map(|v| self.padding.y1 = v).is_some(),
            _ => false,
        }
    }

    /// Serialize back into `style` attribute text.
    pub fn to_css(&self) -> String {
        let mut parts = Vec::new();
        let mut push_px = |name: &str, value: Option<f64>| {
            if let Some(v) = value {
                parts.push(format!("{name}: {}", format_px(v)));
            }
        };
        push_px("width", self.width);
        push_px("height", self.height);
        push_px("left", self.left);
        push_px("top", self.top);
        if self.padding != Insets::ZERO {
            parts.push(format!("padding: {}", format_box(self.padding)));
        }
        if self.border != Insets::ZERO {
            parts.push(format!("border-width: {}", format_box(self.border)));
        }
        for (property, value) in &self.extra {
            parts.push(format!("{property}: {value}"));
        }
        parts.join("; ")
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.left.is_none()
            && self.top.is_none()
            && self.padding == Insets::ZERO
            && self.border == Insets::ZERO
            && self.extra.is_empty()
    }

    /// Width and height, if both are set.
    pub fn size(&self) -> Option<Size> {
        Some(Size::new(self.width?, self.height?))
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = Some(size.width);
        self.height = Some(size.height);
    }

    /// Left and top offsets, missing values read as zero.
    pub fn position(&self) -> Point {
        Point::new(self.left.unwrap_or(0.0), self.top.unwrap_or(0.0))
    }

    pub fn set_position(&mut self, position: Point) {
        self.left = Some(position.x);
        self.top = Some(position.y);
    }

    /// Drop width, height, left and top.
    pub fn clear_geometry(&mut self) {
        self.width = None;
        self.height = None;
        self.left = None;
        self.top = None;
    }
}

fn assign(slot: &mut Option<f64>, value: &str) -> bool {
    match parse_px(value) {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

/// Parse a pixel length such as `12px`, `12.5px` or a bare `0`.
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    let parsed: f64 = number.parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Format a pixel length, rounded to a thousandth of a pixel.
pub fn format_px(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    // Avoid "-0px".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}px")
}

/// CSS box shorthand with one to four values (top, right, bottom, left).
fn parse_box(value: &str) -> Option<Insets> {
    let values: Option<Vec<f64>> = value.split_whitespace().map(parse_px).collect();
    let values = values?;
    let (top, right, bottom, left) = match values.as_slice() {
        [all] => (*all, *all, *all, *all),
        [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
        [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
        [top, right, bottom, left] => (*top, *right, *bottom, *left),
        _ => return None,
    };
    Some(Insets::new(left, top, right, bottom))
}

fn format_box(insets: Insets) -> String {
    format!(
        "{} {} {} {}",
        format_px(insets.y0),
        format_px(insets.x1),
        format_px(insets.y1),
        format_px(insets.x0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_properties() {
        let style = Style::parse("width: 100px; height:50px; left: -2.5px; top: 0");
        assert_eq!(style.width, Some(100.0));
        assert_eq!(style.height, Some(50.0));
        assert_eq!(style.left, Some(-2.5));
        assert_eq!(style.top, Some(0.0));
        assert!(style.extra.is_empty());
    }

    #[test]
    fn test_unknown_properties_survive() {
        let style = Style::parse("float: left; width: 50%; color: red");
        assert_eq!(style.width, None);
        assert_eq!(
            style.extra,
            vec![
                ("float".to_string(), "left".to_string()),
                ("width".to_string(), "50%".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
    }

    #[test]
    fn test_padding_shorthand() {
        let style = Style::parse("padding: 1px 2px 3px 4px");
        assert_eq!(style.padding, Insets::new(4.0, 1.0, 2.0, 3.0));
        let style = Style::parse("padding: 5px 10px");
        assert_eq!(style.padding, Insets::new(10.0, 5.0, 10.0, 5.0));
    }

    #[test]
    fn test_to_css_round_trip() {
        let mut style = Style::default();
        style.set_size(Size::new(200.0, 25.0));
        style.set_position(Point::new(20.0, 2.5));
        style.extra.push(("float".into(), "left".into()));
        let css = style.to_css();
        assert_eq!(css, "width: 200px; height: 25px; left: 20px; top: 2.5px; float: left");
        assert_eq!(Style::parse(&css), style);
    }

    #[test]
    fn test_format_px_rounds_noise() {
        assert_eq!(format_px(49.99999999999999), "50px");
        assert_eq!(format_px(-0.0000001), "0px");
        assert_eq!(format_px(12.3456), "12.346px");
    }

    #[test]
    fn test_clear_geometry() {
        let mut style = Style::parse("width: 1px; height: 2px; left: 3px; top: 4px; float: left");
        style.clear_geometry();
        assert_eq!(style.size(), None);
        assert_eq!(style.position(), Point::ZERO);
        assert!(!style.is_empty());
    }
}
