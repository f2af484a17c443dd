use bytes::Bytes;
use guarded_fetch_domain::FetchError;
use roxmltree::{Attribute, Document, Node, ParsingOptions};
use tracing::warn;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const MAX_NODES: u32 = 100_000;

const ALLOWED_ELEMENTS: &[&str] = &[
    // structure
    "svg", "g", "defs", "title", "desc", "symbol", "use",
    // geometry
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
    // text
    "text", "tspan", "textPath",
    // paint servers and clipping
    "linearGradient", "radialGradient", "stop", "clipPath", "mask", "pattern", "marker",
    // animation
    "animate", "animateTransform", "animateMotion", "set", "mpath",
];

const ANIMATION_ELEMENTS: &[&str] = &["animate", "animateTransform", "animateMotion", "set"];

/// Elements that can run script or pull in active content. Their presence
/// anywhere in the tree rejects the document.
const DANGEROUS_ELEMENTS: &[&str] = &[
    "script",
    "foreignobject",
    "iframe",
    "embed",
    "object",
    "handler",
];

const ALLOWED_ATTRIBUTES: &[&str] = &[
    "id", "class", "transform", "x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "rx", "ry",
    "width", "height", "d", "points", "pathLength", "viewBox", "preserveAspectRatio", "version",
    "fill", "fill-opacity", "fill-rule", "stroke", "stroke-width", "stroke-opacity",
    "stroke-linecap", "stroke-linejoin", "stroke-miterlimit", "stroke-dasharray",
    "stroke-dashoffset", "opacity", "color", "display", "visibility", "clip-path", "clip-rule",
    "clipPathUnits", "mask", "maskUnits", "maskContentUnits", "marker-start", "marker-mid",
    "marker-end", "markerWidth", "markerHeight", "markerUnits", "refX", "refY", "orient",
    "offset", "stop-color", "stop-opacity", "gradientUnits", "gradientTransform",
    "spreadMethod", "fx", "fy", "fr", "patternUnits", "patternContentUnits", "patternTransform",
    "font-family", "font-size", "font-weight", "font-style", "text-anchor", "dominant-baseline",
    "alignment-baseline", "letter-spacing", "word-spacing", "text-decoration", "dx", "dy",
    "rotate", "textLength", "lengthAdjust", "startOffset", "vector-effect", "shape-rendering",
    "paint-order", "attributeName", "attributeType", "from", "to", "by", "values", "keyTimes",
    "keySplines", "keyPoints", "calcMode", "begin", "dur", "end", "repeatCount", "repeatDur",
    "additive", "accumulate", "type", "path",
];

const ALLOWED_URI_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "tel:"];

const SCRIPT_URI_PREFIXES: &[&str] = &["javascript:", "vbscript:"];

/// SVG that passed sanitization.
#[derive(Debug, Clone)]
pub struct SanitizedMarkup {
    /// The original bytes when nothing was removed, otherwise the cleaned
    /// document.
    pub bytes: Bytes,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub warnings: Vec<String>,
}

/// Parses and sanitizes an SVG document.
///
/// Script-capable content (script-like elements, event handlers, script URIs,
/// animations retargeting links or handlers, DTDs) rejects the whole buffer
/// with [`FetchError::MaliciousMarkup`]. Anything else outside the element and
/// attribute allowlists is stripped and reported as a warning.
pub fn sanitize_svg(body: &Bytes) -> Result<SanitizedMarkup, FetchError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| FetchError::MalformedContent("SVG is not valid UTF-8".to_string()))?;

    let mut options = ParsingOptions::default();
    options.allow_dtd = false;
    options.nodes_limit = MAX_NODES;

    let doc = Document::parse_with_options(text, options).map_err(|e| match e {
        roxmltree::Error::DtdDetected => {
            warn!("Rejected SVG with document type declaration");
            FetchError::MaliciousMarkup("document type declarations are not allowed".to_string())
        }
        other => FetchError::MalformedContent(format!("invalid SVG: {}", other)),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(FetchError::MalformedContent(format!(
            "root element is <{}>, expected <svg>",
            root.tag_name().name()
        )));
    }

    if let Some(threat) = find_threat(&doc) {
        warn!(threat = %threat, "Rejected malicious SVG");
        return Err(FetchError::MaliciousMarkup(threat));
    }

    let (width, height) = intrinsic_size(root);

    let mut writer = MarkupWriter::new(text.len(), uses_xlink(&doc));
    for node in doc.root().children() {
        if let Some(pi) = node.pi() {
            if pi.target == "xml-stylesheet" {
                writer.removed("removed xml-stylesheet processing instruction".to_string());
            }
        }
    }
    writer.write_element(root, true);

    if writer.warnings.is_empty() {
        return Ok(SanitizedMarkup {
            bytes: body.clone(),
            width,
            height,
            warnings: Vec::new(),
        });
    }

    Ok(SanitizedMarkup {
        bytes: Bytes::from(writer.out),
        width,
        height,
        warnings: writer.warnings,
    })
}

fn find_threat(doc: &Document) -> Option<String> {
    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();

        if DANGEROUS_ELEMENTS
            .iter()
            .any(|dangerous| dangerous.eq_ignore_ascii_case(name))
        {
            return Some(format!("<{}> element", name));
        }

        for attr in node.attributes() {
            let attr_name = attr.name();
            if attr_name
                .get(..2)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
            {
                return Some(format!("event handler '{}' on <{}>", attr_name, name));
            }
            if is_script_uri(attr.value()) {
                return Some(format!("script URI in '{}' on <{}>", attr_name, name));
            }
            if attr_name == "style" && style_is_scriptable(attr.value()) {
                return Some(format!("scriptable style on <{}>", name));
            }
        }

        if ANIMATION_ELEMENTS.contains(&name) {
            if let Some(target) = node.attribute("attributeName") {
                let target = target.trim().to_ascii_lowercase();
                let local = target.rsplit(':').next().unwrap_or_default();
                if local == "href" || local.starts_with("on") {
                    return Some(format!("<{}> targeting '{}'", name, target));
                }
            }
        }
    }
    None
}

/// Lowercased value with whitespace and control characters removed, the way
/// URL parsers read `java\tscript:`.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_script_uri(value: &str) -> bool {
    let normalized = normalize(value);
    SCRIPT_URI_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

fn style_is_scriptable(value: &str) -> bool {
    let normalized = normalize(value);
    SCRIPT_URI_PREFIXES
        .iter()
        .any(|prefix| normalized.contains(prefix))
        || normalized.contains("expression(")
}

fn is_allowed_uri(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.starts_with('#') {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    ALLOWED_URI_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Inline styles may only reference local fragments and may not import.
fn is_safe_style(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if lower.contains("@import") {
        return false;
    }
    lower.match_indices("url(").all(|(idx, _)| {
        lower[idx + 4..]
            .trim_start()
            .trim_start_matches(['\'', '"'])
            .starts_with('#')
    })
}

fn uses_xlink(doc: &Document) -> bool {
    doc.descendants().any(|node| {
        node.attributes()
            .any(|attr| attr.namespace() == Some(XLINK_NS) && attr.name() == "href")
    })
}

fn intrinsic_size(root: Node) -> (Option<u32>, Option<u32>) {
    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);
    if width.is_some() && height.is_some() {
        return (width, height);
    }

    let view_box: Vec<f64> = root
        .attribute("viewBox")
        .map(|vb| {
            vb.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty())
                .filter_map(|part| part.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    match view_box.as_slice() {
        [_, _, w, h] => (
            width.or_else(|| to_pixels(*w)),
            height.or_else(|| to_pixels(*h)),
        ),
        _ => (width, height),
    }
}

/// Accepts unitless and `px` lengths only.
fn parse_length(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    to_pixels(number.trim().parse().ok()?)
}

fn to_pixels(value: f64) -> Option<u32> {
    (value.is_finite() && value > 0.0 && value <= f64::from(u32::MAX)).then(|| value.ceil() as u32)
}

struct MarkupWriter {
    out: String,
    warnings: Vec<String>,
    declare_xlink: bool,
}

impl MarkupWriter {
    fn new(capacity: usize, declare_xlink: bool) -> Self {
        Self {
            out: String::with_capacity(capacity),
            warnings: Vec::new(),
            declare_xlink,
        }
    }

    fn removed(&mut self, message: String) {
        warn!(removed = %message, "Sanitized SVG");
        self.warnings.push(message);
    }

    fn write_element(&mut self, node: Node, is_root: bool) {
        let tag = node.tag_name();
        let name = tag.name();
        let in_svg_ns = matches!(tag.namespace(), None | Some(SVG_NS));
        if !in_svg_ns || !ALLOWED_ELEMENTS.contains(&name) {
            self.removed(format!("removed <{}> element", name));
            return;
        }

        self.out.push('<');
        self.out.push_str(name);
        if is_root {
            self.out.push_str(" xmlns=\"");
            self.out.push_str(SVG_NS);
            self.out.push('"');
            if self.declare_xlink {
                self.out.push_str(" xmlns:xlink=\"");
                self.out.push_str(XLINK_NS);
                self.out.push('"');
            }
        }

        for attr in node.attributes() {
            match allowed_attribute_name(&attr) {
                Some(qualified) => {
                    self.out.push(' ');
                    self.out.push_str(qualified);
                    self.out.push_str("=\"");
                    escape_into(&mut self.out, attr.value(), true);
                    self.out.push('"');
                }
                None => self.removed(format!(
                    "removed '{}' attribute from <{}>",
                    attr.name(),
                    name
                )),
            }
        }
        self.out.push('>');

        for child in node.children() {
            if child.is_element() {
                self.write_element(child, false);
            } else if let Some(text) = child.text().filter(|_| child.is_text()) {
                escape_into(&mut self.out, text, false);
            }
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

/// Name to serialize an attribute under, or `None` if it must be dropped.
fn allowed_attribute_name<'a>(attr: &Attribute<'a, '_>) -> Option<&'a str> {
    let name = attr.name();
    match attr.namespace() {
        Some(XLINK_NS) if name == "href" => is_allowed_uri(attr.value()).then_some("xlink:href"),
        Some(XML_NS) if name == "space" => Some("xml:space"),
        Some(XML_NS) if name == "lang" => Some("xml:lang"),
        Some(_) => None,
        None if name == "href" => is_allowed_uri(attr.value()).then_some("href"),
        None if name == "style" => is_safe_style(attr.value()).then_some("style"),
        None => ALLOWED_ATTRIBUTES.contains(&name).then_some(name),
    }
}

fn escape_into(out: &mut String, value: &str, in_attribute: bool) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
