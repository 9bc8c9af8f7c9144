//! Package relationships (`_rels/*.rels` parts).

use crate::xml::xml_error;
use deck_core::Result;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Relationship type of a slide, relative to the relationships namespace.
pub const SLIDE: &str = "/slide";
/// Relationship type of a slide's notes.
pub const NOTES_SLIDE: &str = "/notesSlide";
/// Relationship type of the main document part.
pub const OFFICE_DOCUMENT: &str = "/officeDocument";

const TRANSITIONAL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Full transitional relationship type for a short type such as [`SLIDE`].
pub fn full_type(short: &str) -> String {
    format!("{}{}", TRANSITIONAL_NS, short)
}

/// Whether `rel_type` ends in the short type (works for strict and
/// transitional namespaces alike).
pub fn is_type(rel_type: &str, short: &str) -> bool {
    rel_type.ends_with(short)
}

/// One relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `TargetMode="External"`: the target is a URL, not a package part.
    pub external: bool,
}

/// The relationships of one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` document.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut items = Vec::new();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"Relationship" => {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                        external: false,
                    };

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.external = value == "External",
                            _ => {}
                        }
                    }
                    items.push(rel);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { items })
    }

    /// Serialize back to a `.rels` document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for rel in &self.items {
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"",
                escape(rel.id.as_str()),
                escape(rel.rel_type.as_str()),
                escape(rel.target.as_str())
            ));
            if rel.external {
                xml.push_str(" TargetMode=\"External\"");
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// First relationship of the given short type.
    pub fn find_type(&self, short: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| is_type(&r.rel_type, short))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        self.items.iter_mut().find(|r| r.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn push(&mut self, rel: Relationship) {
        self.items.push(rel);
    }

    /// Add an internal relationship under a fresh id and return the id.
    pub fn add(&mut self, rel_type: impl Into<String>, target: impl Into<String>) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.into(),
            target: target.into(),
            external: false,
        });
        id
    }

    /// An `rIdN` not used by any relationship.
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }
}

/// The relationships part that belongs to `part`.
///
/// `ppt/slides/slide1.xml` gives `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// The part a relationships part belongs to; the inverse of
/// [`rels_part_for`]. The package relationships give `""`.
pub fn rels_owner(rels_part: &str) -> Option<String> {
    let stem = rels_part.strip_suffix(".rels")?;
    if let Some(file) = stem.strip_prefix("_rels/") {
        return Some(file.to_string());
    }
    let (dir, file) = stem.rsplit_once("/_rels/")?;
    Some(format!("{}/{}", dir, file))
}

/// Resolve a relationship target against the part that owns it.
///
/// Returns a part name without a leading slash.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute.split('/'));
    }
    let dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    normalize(dir.split('/').chain(target.split('/')))
}

fn normalize<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in segments {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// Target string that reaches `part` from a relationship owned by
/// `source_part`.
pub fn relative_target(source_part: &str, part: &str) -> String {
    let dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    if dir.is_empty() {
        return part.to_string();
    }
    match part.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{}", part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::parse(RELS).unwrap();
        assert_eq!(rels.iter().count(), 3);

        let slide = rels.get("rId3").unwrap();
        assert!(is_type(&slide.rel_type, SLIDE));
        assert!(!is_type(&rels.get("rId1").unwrap().rel_type, SLIDE));
        assert_eq!(slide.target, "slides/slide2.xml");

        let link = rels.get("rId9").unwrap();
        assert!(link.external);
        assert_eq!(link.target, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn test_round_trip_preserves_entries() {
        let rels = Relationships::parse(RELS).unwrap();
        let again = Relationships::parse(&rels.to_xml()).unwrap();
        assert_eq!(rels, again);
    }

    #[test]
    fn test_add_and_remove() {
        let mut rels = Relationships::parse(RELS).unwrap();
        assert_eq!(rels.next_id(), "rId10");
        let id = rels.add(full_type(SLIDE), "slides/slide7.xml");
        assert_eq!(id, "rId10");
        assert_eq!(rels.find_type(SLIDE).unwrap().id, "rId3");

        assert!(rels.remove("rId3").is_some());
        assert!(rels.remove("rId3").is_none());
        assert_eq!(rels.find_type(SLIDE).unwrap().id, "rId10");
    }

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_part_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_rels_owner() {
        assert_eq!(rels_owner("ppt/slides/_rels/slide1.xml.rels").as_deref(), Some("ppt/slides/slide1.xml"));
        assert_eq!(rels_owner("_rels/.rels").as_deref(), Some(""));
        assert_eq!(rels_owner("ppt/presentation.xml"), None);
        assert_eq!(rels_owner("ppt/media/logo.rels"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide3.xml"), "ppt/slides/slide3.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("ppt/presentation.xml", "ppt/slides/slide4.xml"), "slides/slide4.xml");
        assert_eq!(relative_target("ppt/slides/slide1.xml", "ppt/media/image1.png"), "/ppt/media/image1.png");
    }
}
