//! The presentation part: slide order and the slide id list.

use crate::rels::{self, Relationships};
use crate::xml::{attr, element_name, local_name, prefix, prefixed_attr, qualified, rewrite, xml_error, Edit};
use deck_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

/// Where the main part lives when the package relationships do not say.
pub const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Smallest slide id PowerPoint accepts.
const MIN_SLIDE_ID: u32 = 256;

const RELATIONSHIP_NAMESPACES: [&str; 2] = [
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    "http://purl.oclc.org/ooxml/officeDocument/relationships",
];

/// Elements that precede `sldIdLst` inside `presentation`, in schema order.
const LISTS_BEFORE_SLIDES: [&[u8]; 3] = [b"sldMasterIdLst", b"notesMasterIdLst", b"handoutMasterIdLst"];

/// One entry of the slide list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    /// `p:sldId/@id`, unique within the presentation.
    pub id: u32,
    /// Relationship id from the presentation part to the slide part.
    pub rel_id: String,
    /// Slide part name.
    pub part: String,
}

/// Find the presentation part through the package relationships.
pub fn presentation_part(package_rels: Option<&Relationships>) -> String {
    package_rels
        .and_then(|r| r.find_type(rels::OFFICE_DOCUMENT))
        .map(|r| rels::resolve_target("", &r.target))
        .unwrap_or_else(|| DEFAULT_PRESENTATION_PART.to_string())
}

/// Slides in presentation order.
///
/// The order is the order of `p:sldIdLst`, not of the relationship ids.
pub fn slide_list(xml: &str, part: &str, rels: &Relationships) -> Result<Vec<SlideRef>> {
    let mut slides = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut depth = 0usize;
    let mut in_list = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(ref e) => {
                if depth == 1 && element_name(e) == b"sldIdLst" {
                    in_list = true;
                }
                depth += 1;
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                if depth == 1 && local_name(e.name().into_inner()) == b"sldIdLst" {
                    in_list = false;
                }
            }
            Event::Empty(ref e) if in_list && depth == 2 && element_name(e) == b"sldId" => {
                let id = attr(e, b"id")
                    .and_then(|v| v.parse::<u32>().ok())
                    .ok_or_else(|| Error::CorruptedFile("slide entry without a numeric id".to_string()))?;
                let rel_id = prefixed_attr(e, b"id")
                    .ok_or_else(|| Error::CorruptedFile(format!("slide {} has no relationship id", id)))?;
                let rel = rels.get(&rel_id).ok_or_else(|| {
                    Error::CorruptedFile(format!("slide {} points at unknown relationship {}", id, rel_id))
                })?;
                slides.push(SlideRef {
                    id,
                    part: rels::resolve_target(part, &rel.target),
                    rel_id,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(slides)
}

/// Remove every `sldId` entry with the given id: the slide list entry and
/// any section membership.
pub fn remove_slide_id(xml: &str, id: u32) -> Result<String> {
    let id = id.to_string();
    rewrite(xml, |event, _| match event {
        Event::Empty(e) | Event::Start(e)
            if element_name(e) == b"sldId" && attr(e, b"id").as_deref() == Some(id.as_str()) =>
        {
            Edit::Drop
        }
        _ => Edit::Keep,
    })
}

/// Naming facts gathered before editing the slide list.
#[derive(Debug, Default)]
struct Layout {
    /// Prefix of the presentation element (`p`).
    element_prefix: Option<String>,
    /// Prefix bound to the relationships namespace (`r`).
    rel_prefix: Option<String>,
    has_slide_list: bool,
    /// Last list element that precedes the slide list.
    anchor: Option<Vec<u8>>,
}

fn scan_layout(xml: &str) -> Result<Layout> {
    let mut layout = Layout::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                if depth == 0 {
                    layout.element_prefix = prefix(e.name().into_inner()).map(str::to_string);
                    for a in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&a.value);
                        if let Some(p) = a.key.as_ref().strip_prefix(b"xmlns:") {
                            if RELATIONSHIP_NAMESPACES.contains(&value.as_ref()) {
                                layout.rel_prefix = Some(String::from_utf8_lossy(p).to_string());
                            }
                        }
                    }
                } else if depth == 1 {
                    let name = element_name(e);
                    if name == b"sldIdLst" {
                        layout.has_slide_list = true;
                    } else if LISTS_BEFORE_SLIDES.contains(&name) {
                        layout.anchor = Some(name.to_vec());
                    }
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layout)
}

/// Append a slide list entry.
pub fn append_slide_id(xml: &str, id: u32, rel_id: &str) -> Result<String> {
    let layout = scan_layout(xml)?;
    let element_prefix = layout.element_prefix.as_deref();
    let rel_key = qualified(Some(layout.rel_prefix.as_deref().unwrap_or("r")), "id");
    let id = id.to_string();

    let entry = || {
        let mut e = BytesStart::new(qualified(element_prefix, "sldId"));
        e.push_attribute(("id", id.as_str()));
        e.push_attribute((rel_key.as_str(), rel_id));
        Event::Empty(e)
    };
    let list_name = qualified(element_prefix, "sldIdLst");
    let new_list = || {
        vec![
            Event::Start(BytesStart::new(list_name.clone())),
            entry(),
            Event::End(BytesEnd::new(list_name.clone())),
        ]
    };

    let mut inserted = false;
    let updated = rewrite(xml, |event, depth| {
        if inserted || depth != 1 {
            return Edit::Keep;
        }
        match event {
            Event::End(e) if local_name(e.name().into_inner()) == b"sldIdLst" => {
                inserted = true;
                Edit::Before(vec![entry()])
            }
            Event::Empty(e) if element_name(e) == b"sldIdLst" => {
                inserted = true;
                Edit::Replace(new_list())
            }
            Event::End(e)
                if !layout.has_slide_list
                    && layout.anchor.as_deref() == Some(local_name(e.name().into_inner())) =>
            {
                inserted = true;
                Edit::After(new_list())
            }
            Event::Empty(e)
                if !layout.has_slide_list && layout.anchor.as_deref() == Some(element_name(e)) =>
            {
                inserted = true;
                Edit::After(new_list())
            }
            _ => Edit::Keep,
        }
    })?;

    if !inserted {
        return Err(Error::CorruptedFile(
            "presentation has no place for a slide list".to_string(),
        ));
    }
    add_to_last_section(&updated, &id)
}

fn count_sections(xml: &str) -> Result<usize> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut list_depth = None;
    let mut count = 0;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let name = element_name(e);
                if name == b"sectionLst" && matches!(event, Event::Start(_)) {
                    list_depth = Some(depth);
                } else if name == b"section" && list_depth.map(|d| d + 1) == Some(depth) {
                    count += 1;
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if list_depth == Some(depth) && local_name(e.name().into_inner()) == b"sectionLst" {
                    list_depth = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(count)
}

/// Put slide `id` at the end of the last section so that PowerPoint keeps
/// showing it. Decks without sections are returned unchanged.
fn add_to_last_section(xml: &str, id: &str) -> Result<String> {
    let total = count_sections(xml)?;
    if total == 0 {
        return Ok(xml.to_string());
    }

    let mut list_depth: Option<usize> = None;
    let mut seen = 0;
    let mut section_prefix: Option<String> = None;
    let mut in_last = false;
    let mut done = false;

    let entry = |p: Option<&str>| {
        let mut e = BytesStart::new(qualified(p, "sldId"));
        e.push_attribute(("id", id));
        Event::Empty(e)
    };
    let new_list = |p: Option<&str>| {
        let name = qualified(p, "sldIdLst");
        vec![
            Event::Start(BytesStart::new(name.clone())),
            entry(p),
            Event::End(BytesEnd::new(name)),
        ]
    };

    rewrite(xml, |event, depth| {
        if done {
            return Edit::Keep;
        }
        match event {
            Event::Start(e) if element_name(e) == b"sectionLst" => {
                list_depth = Some(depth);
                Edit::Keep
            }
            Event::Start(e) | Event::Empty(e)
                if element_name(e) == b"section" && list_depth.map(|d| d + 1) == Some(depth) =>
            {
                seen += 1;
                if seen < total {
                    return Edit::Keep;
                }
                let p = prefix(e.name().into_inner()).map(str::to_string);
                if matches!(event, Event::Empty(_)) {
                    done = true;
                    let name = e.name().into_inner().to_vec();
                    let mut events = vec![Event::Start(e.clone().into_owned())];
                    events.extend(new_list(p.as_deref()));
                    events.push(Event::End(BytesEnd::new(String::from_utf8_lossy(&name).into_owned())));
                    return Edit::Replace(events);
                }
                section_prefix = p;
                in_last = true;
                Edit::Keep
            }
            Event::End(e)
                if in_last
                    && list_depth.map(|d| d + 2) == Some(depth)
                    && local_name(e.name().into_inner()) == b"sldIdLst" =>
            {
                done = true;
                Edit::Before(vec![entry(section_prefix.as_deref())])
            }
            Event::Empty(e)
                if in_last && list_depth.map(|d| d + 2) == Some(depth) && element_name(e) == b"sldIdLst" =>
            {
                done = true;
                Edit::Replace(new_list(section_prefix.as_deref()))
            }
            Event::End(e)
                if in_last
                    && list_depth.map(|d| d + 1) == Some(depth)
                    && local_name(e.name().into_inner()) == b"section" =>
            {
                done = true;
                Edit::Before(new_list(section_prefix.as_deref()))
            }
            _ => Edit::Keep,
        }
    })
}

/// A slide id not used by any slide in `slides`.
pub fn next_slide_id(slides: &[SlideRef]) -> u32 {
    slides
        .iter()
        .map(|s| s.id + 1)
        .max()
        .unwrap_or(MIN_SLIDE_ID)
        .max(MIN_SLIDE_ID)
}
