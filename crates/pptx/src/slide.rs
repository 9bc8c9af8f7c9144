//! Shapes on a slide part.
//!
//! Shapes are the element children of `p:spTree` (group properties aside),
//! in document order. Only a `p:sp` with its own `p:txBody` has a text frame.

use crate::xml::{attr, element_name, local_name, rewrite, xml_error, Edit};
use deck_core::{Error, Result, Shape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// `p:spTree` children that describe the tree itself rather than a shape.
const TREE_PROPERTIES: [&[u8]; 3] = [b"nvGrpSpPr", b"grpSpPr", b"extLst"];

/// Line break inside a paragraph, as PowerPoint reports it.
const LINE_BREAK: char = '\u{b}';

fn is_shape(e: &BytesStart<'_>) -> bool {
    !TREE_PROPERTIES.contains(&element_name(e))
}

/// Shape being collected.
#[derive(Debug, Default)]
struct ShapeInfo {
    name: Option<String>,
    is_sp: bool,
    text: Option<String>,
    paragraphs: usize,
}

impl ShapeInfo {
    fn into_shape(self, index: usize) -> Shape {
        Shape {
            index,
            name: self.name.unwrap_or_default(),
            text: self.text,
        }
    }
}

/// Read the shapes of a slide.
pub fn read_shapes(xml: &str) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut current: Option<ShapeInfo> = None;
    let mut in_text_body = false;
    let mut in_run_text = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(ref e) => {
                let name = element_name(e);
                match tree_depth {
                    None if name == b"spTree" => tree_depth = Some(depth),
                    Some(tree) if depth == tree + 1 && is_shape(e) => {
                        current = Some(ShapeInfo {
                            is_sp: name == b"sp",
                            ..ShapeInfo::default()
                        });
                    }
                    Some(tree) if depth > tree + 1 => {
                        if let Some(ref mut shape) = current {
                            match name {
                                b"cNvPr" if shape.name.is_none() => shape.name = attr(e, b"name"),
                                // Text frame of the shape itself, not of a nested one.
                                b"txBody" if shape.is_sp && depth == tree + 2 => {
                                    in_text_body = true;
                                    shape.text = Some(String::new());
                                }
                                b"p" if in_text_body => {
                                    if shape.paragraphs > 0 {
                                        if let Some(ref mut text) = shape.text {
                                            text.push('\n');
                                        }
                                    }
                                    shape.paragraphs += 1;
                                }
                                b"t" if in_text_body => in_run_text = true,
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(ref e) => {
                let name = element_name(e);
                match tree_depth {
                    Some(tree) if depth == tree + 1 && is_shape(e) => {
                        let shape = ShapeInfo {
                            name: attr(e, b"name"),
                            ..ShapeInfo::default()
                        };
                        shapes.push(shape.into_shape(shapes.len() + 1));
                    }
                    Some(tree) if depth > tree + 1 => {
                        if let Some(ref mut shape) = current {
                            match name {
                                b"cNvPr" if shape.name.is_none() => shape.name = attr(e, b"name"),
                                b"br" if in_text_body => {
                                    if let Some(ref mut text) = shape.text {
                                        text.push(LINE_BREAK);
                                    }
                                }
                                // An empty paragraph still separates lines.
                                b"p" if in_text_body => {
                                    if shape.paragraphs > 0 {
                                        if let Some(ref mut text) = shape.text {
                                            text.push('\n');
                                        }
                                    }
                                    shape.paragraphs += 1;
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                if in_run_text {
                    if let Some(text) = current.as_mut().and_then(|s| s.text.as_mut()) {
                        text.push_str(&e.unescape().map_err(xml_error)?);
                    }
                }
            }
            Event::CData(ref e) => {
                if in_run_text {
                    if let Some(text) = current.as_mut().and_then(|s| s.text.as_mut()) {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                let name = local_name(e.name().into_inner());
                match tree_depth {
                    Some(tree) if depth == tree => {
                        // End of spTree; nothing after it is a shape.
                        tree_depth = None;
                        break;
                    }
                    Some(tree) if depth == tree + 1 => {
                        if let Some(shape) = current.take() {
                            shapes.push(shape.into_shape(shapes.len() + 1));
                        }
                        in_text_body = false;
                        in_run_text = false;
                    }
                    Some(tree) if depth == tree + 2 && name == b"txBody" => in_text_body = false,
                    Some(_) if name == b"t" => in_run_text = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if tree_depth.is_some() {
        return Err(Error::XmlError("slide shape tree is not closed".to_string()));
    }
    Ok(shapes)
}

/// Remove the shape at 1-based `index` from a slide.
pub fn delete_shape(xml: &str, index: usize) -> Result<String> {
    let mut tree_depth: Option<usize> = None;
    let mut seen = 0usize;
    let mut deleted = false;

    let updated = rewrite(xml, |event, depth| {
        match event {
            Event::Start(e) if tree_depth.is_none() && element_name(e) == b"spTree" => {
                tree_depth = Some(depth);
            }
            Event::Start(e) | Event::Empty(e)
                if !deleted && tree_depth.is_some_and(|t| depth == t + 1) && is_shape(e) =>
            {
                seen += 1;
                if seen == index {
                    deleted = true;
                    return Edit::Drop;
                }
            }
            _ => {}
        }
        Edit::Keep
    })?;

    if !deleted {
        return Err(Error::XmlError(format!(
            "slide has {} shape(s), cannot delete shape {}",
            seen, index
        )));
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr/>
        <p:txBody><a:bodyPr/><a:p><a:r><a:t>Release </a:t></a:r><a:r><a:t>plan</a:t></a:r></a:p><a:p><a:r><a:t>Q3 &amp; Q4</a:t></a:r></a:p></p:txBody>
      </p:sp>
      <p:pic>
        <p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
        <p:blipFill/><p:spPr/>
      </p:pic>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="4" name="TextBox 3"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
        <p:spPr/>
        <p:txBody><a:bodyPr/><a:p><a:r><a:t>both</a:t></a:r></a:p></p:txBody>
      </p:sp>
      <p:grpSp>
        <p:nvGrpSpPr><p:cNvPr id="5" name="Group 4"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
        <p:grpSpPr/>
        <p:sp>
          <p:nvSpPr><p:cNvPr id="6" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
          <p:txBody><a:bodyPr/><a:p><a:r><a:t>test-oriented</a:t></a:r></a:p></p:txBody>
        </p:sp>
      </p:grpSp>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="7" name="Empty box"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:txBody><a:bodyPr/><a:p><a:endParaRPr/></a:p></p:txBody>
      </p:sp>
    </p:spTree>
  </p:cSld>
</p:sld>"#;

    #[test]
    fn test_read_shapes() {
        let shapes = read_shapes(SLIDE).unwrap();
        assert_eq!(shapes.len(), 5);

        assert_eq!(shapes[0], Shape::with_text(1, "Title 1", "Release plan\nQ3 & Q4"));
        assert_eq!(shapes[1], Shape::without_text(2, "Picture 2"));
        assert_eq!(shapes[2], Shape::with_text(3, "TextBox 3", "both"));
        // Groups have no text frame of their own.
        assert_eq!(shapes[3], Shape::without_text(4, "Group 4"));
        assert_eq!(shapes[4], Shape::with_text(5, "Empty box", ""));
        assert!(!shapes[4].has_text());
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let xml = SLIDE.replace("<a:t>both</a:t>", "<a:t> both </a:t>");
        let shapes = read_shapes(&xml).unwrap();
        assert_eq!(shapes[2].text.as_deref(), Some(" both "));
    }

    #[test]
    fn test_delete_shape() {
        let xml = delete_shape(SLIDE, 3).unwrap();
        assert!(!xml.contains("TextBox 3"));

        let shapes = read_shapes(&xml).unwrap();
        assert_eq!(shapes.len(), 4);
        assert_eq!(shapes[2].name, "Group 4");
        assert_eq!(shapes[2].index, 3);
        // Everything else is byte-for-byte unchanged.
        assert!(xml.contains("<p:cNvPr id=\"2\" name=\"Title 1\"/>"));
        assert!(xml.contains("Q3 &amp; Q4"));
    }

    #[test]
    fn test_delete_group_takes_children() {
        let xml = delete_shape(SLIDE, 4).unwrap();
        assert!(!xml.contains("Inner"));
        assert_eq!(read_shapes(&xml).unwrap().len(), 4);
    }

    #[test]
    fn test_delete_out_of_range() {
        assert!(delete_shape(SLIDE, 6).is_err());
        assert!(delete_shape(SLIDE, 0).is_err());
    }

    #[test]
    fn test_slide_without_shapes() {
        let xml = r#"<p:sld xmlns:p="p"><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/></p:spTree></p:cSld></p:sld>"#;
        assert!(read_shapes(xml).unwrap().is_empty());
    }
}
