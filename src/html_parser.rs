use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use html5ever::serialize::SerializeOpts;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, serialize, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use mime::Mime;

use crate::error::{MirrorError, Result};

/// Raw attribute value as written in the markup → absolute local file path.
pub type PathMapping = HashMap<String, PathBuf>;

/// Where asset URLs live in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceClass {
    Image,
    Link,
    Script,
}

impl ReferenceClass {
    pub const ALL: [ReferenceClass; 3] = [
        ReferenceClass::Image,
        ReferenceClass::Link,
        ReferenceClass::Script,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ReferenceClass::Image => "img",
            ReferenceClass::Link => "link",
            ReferenceClass::Script => "script",
        }
    }

    pub fn attribute(self) -> &'static str {
        match self {
            ReferenceClass::Image => "src",
            ReferenceClass::Link => "href",
            ReferenceClass::Script => "src",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub class: ReferenceClass,
    pub raw: String,
}

/// A parsed HTML document that can be scanned and rewritten in place.
pub struct HtmlDocument {
    dom: RcDom,
    encoding: &'static Encoding,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self::parse_with_encoding(html, UTF_8)
    }

    /// Decode a response body and parse it.
    ///
    /// A byte-order mark wins, then the `charset` of `content_type`, then
    /// UTF-8. [`to_bytes`](Self::to_bytes) writes the same encoding back.
    pub fn from_bytes(body: &[u8], content_type: Option<&str>) -> Self {
        let declared = content_type.and_then(charset_of).unwrap_or(UTF_8);
        let (html, encoding, malformed) = declared.decode(body);
        if malformed {
            tracing::debug!(encoding = encoding.name(), "page has malformed byte sequences");
        }
        Self::parse_with_encoding(&html, encoding)
    }

    fn parse_with_encoding(html: &str, encoding: &'static Encoding) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Self { dom, encoding }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// All asset references of `classes`, in document order per class.
    /// Elements lacking the attribute are skipped.
    pub fn asset_references(&self, classes: &[ReferenceClass]) -> Vec<AssetReference> {
        let mut references = Vec::new();
        for &class in classes {
            for element in self.elements(class.tag()) {
                if let Some(raw) = attribute(&element, class.attribute()) {
                    references.push(AssetReference { class, raw });
                }
            }
        }
        references
    }

    /// Point every reference found in `mapping` at its local copy.
    ///
    /// The new value is the mapped path relative to the parent of
    /// `assets_dir`, which is where the page itself is saved. Returns the
    /// number of attributes changed.
    pub fn rewrite(
        &mut self,
        classes: &[ReferenceClass],
        mapping: &PathMapping,
        assets_dir: &Path,
    ) -> usize {
        let Some(page_dir) = assets_dir.parent() else {
            return 0;
        };

        let mut rewritten = 0;
        for &class in classes {
            for element in self.elements(class.tag()) {
                let NodeData::Element { ref attrs, .. } = element.data else {
                    continue;
                };
                let mut attrs = attrs.borrow_mut();
                let Some(attr) = attrs
                    .iter_mut()
                    .find(|a| &*a.name.local == class.attribute())
                else {
                    continue;
                };
                let Some(local) = mapping.get(&*attr.value) else {
                    continue;
                };
                match relative_link(local, page_dir) {
                    Some(link) => {
                        tracing::trace!(from = %&*attr.value, to = %link, "rewriting reference");
                        attr.value = StrTendril::from_slice(&link);
                        rewritten += 1;
                    }
                    None => tracing::warn!(
                        path = %local.display(),
                        "asset is outside the page directory"
                    ),
                }
            }
        }
        rewritten
    }

    pub fn to_html(&self) -> Result<String> {
        let mut bytes = Vec::new();
        let document: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut bytes, &document, SerializeOpts::default()).map_err(MirrorError::Markup)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The serialized document in its source encoding. Characters that
    /// encoding cannot represent become numeric character references.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let html = self.to_html()?;
        let (bytes, _, _) = self.encoding.encode(&html);
        Ok(bytes.into_owned())
    }

    /// Elements named `tag`, in document order.
    fn elements(&self, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        let mut stack = vec![self.dom.document.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Element { ref name, .. } = node.data {
                if &*name.local == tag {
                    found.push(node.clone());
                }
            }
            stack.extend(node.children.borrow().iter().rev().cloned());
        }
        found
    }
}

fn attribute(element: &Handle, name: &str) -> Option<String> {
    match element.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn charset_of(content_type: &str) -> Option<&'static Encoding> {
    let mime: Mime = content_type.trim().parse().ok()?;
    let charset = mime.get_param(mime::CHARSET)?;
    Encoding::for_label(charset.as_str().as_bytes())
}

/// `local` relative to `base`, joined with `/` whatever the platform.
fn relative_link(local: &Path, base: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(local, base)?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="/assets/app.css">
  <link rel="canonical" href="https://a.com/">
  <script src="/js/app.js"></script>
  <script>inline()</script>
</head>
<body>
  <img src="/i/a.png" alt="a">
  <img src="http://other.com/b.png">
  <img alt="no source">
</body>
</html>"#;

    #[test]
    fn test_asset_references_in_order() {
        let document = HtmlDocument::parse(PAGE);
        let references = document.asset_references(&ReferenceClass::ALL);

        let found: Vec<(ReferenceClass, &str)> = references
            .iter()
            .map(|r| (r.class, r.raw.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (ReferenceClass::Image, "/i/a.png"),
                (ReferenceClass::Image, "http://other.com/b.png"),
                (ReferenceClass::Link, "/assets/app.css"),
                (ReferenceClass::Link, "https://a.com/"),
                (ReferenceClass::Script, "/js/app.js"),
            ]
        );
    }

    #[test]
    fn test_asset_references_single_class() {
        let document = HtmlDocument::parse(PAGE);
        let references = document.asset_references(&[ReferenceClass::Script]);
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].raw, "/js/app.js");
    }

    #[test]
    fn test_rewrite_mapped_references_only() {
        let mut document = HtmlDocument::parse(PAGE);
        let assets_dir = PathBuf::from("/out/a-com_files");
        let mapping = PathMapping::from([
            ("/i/a.png".to_string(), assets_dir.join("a-com-i-a-png.png")),
            ("/js/app.js".to_string(), assets_dir.join("a-com-js-app-js.js")),
        ]);

        let count = document.rewrite(&ReferenceClass::ALL, &mapping, &assets_dir);
        assert_eq!(count, 2);

        let reparsed = HtmlDocument::parse(&document.to_html().unwrap());
        let raws: Vec<String> = reparsed
            .asset_references(&ReferenceClass::ALL)
            .into_iter()
            .map(|r| r.raw)
            .collect();
        assert_eq!(
            raws,
            vec![
                "a-com_files/a-com-i-a-png.png",
                "http://other.com/b.png",
                "/assets/app.css",
                "https://a.com/",
                "a-com_files/a-com-js-app-js.js",
            ]
        );
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let assets_dir = PathBuf::from("/out/a-com_files");
        let mapping = PathMapping::from([("/i/a.png".to_string(), assets_dir.join("a.png"))]);

        let render = || {
            let mut document = HtmlDocument::parse(PAGE);
            document.rewrite(&ReferenceClass::ALL, &mapping, &assets_dir);
            document.to_html().unwrap()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_serialize_preserves_attribute_order() {
        let document = HtmlDocument::parse(r#"<img alt="x" src="/a.png" width="3">"#);
        let html = document.to_html().unwrap();
        assert!(html.contains(r#"<img alt="x" src="/a.png" width="3">"#), "{html}");
    }

    #[test]
    fn test_from_bytes_decodes_declared_charset() {
        let html = "<p>Привет</p><img src=\"/а.png\">";
        let (body, _, _) = encoding_rs::WINDOWS_1251.encode(html);
        let document = HtmlDocument::from_bytes(&body, Some("text/html; charset=windows-1251"));

        assert_eq!(document.encoding(), encoding_rs::WINDOWS_1251);
        let html = document.to_html().unwrap();
        assert!(html.contains("Привет"), "{html}");
        assert_eq!(
            document.asset_references(&[ReferenceClass::Image])[0].raw,
            "/а.png"
        );

        let bytes = document.to_bytes().unwrap();
        let (saved, _, malformed) = encoding_rs::WINDOWS_1251.decode(&bytes);
        assert!(!malformed);
        assert!(saved.contains("<p>Привет</p>"), "{saved}");
    }

    #[test]
    fn test_from_bytes_defaults_to_utf8() {
        let body = "<p>Привет</p>".as_bytes();
        for content_type in [None, Some("text/html"), Some("text/html; charset=bogus")] {
            let document = HtmlDocument::from_bytes(body, content_type);
            assert_eq!(document.encoding(), UTF_8);
            assert!(document.to_html().unwrap().contains("Привет"));
        }
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(
            relative_link(Path::new("/out/x_files/a.png"), Path::new("/out")).as_deref(),
            Some("x_files/a.png")
        );
    }
}
