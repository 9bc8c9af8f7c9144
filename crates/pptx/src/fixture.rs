//! Small but well-formed `.pptx` packages for tests.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PREFIX: &str = "application/vnd.openxmlformats-officedocument";

/// A 1x1 PNG.
const PIXEL: [u8; 67] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4, 0x89, 0x00, 0x00, 0x00,
    0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d,
    0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone)]
enum FixtureShape {
    Text { name: String, text: String },
    /// Picture of `ppt/media/<file>`.
    Picture(String),
    /// Textbox with a jump link to another slide of the deck.
    Link(usize),
}

/// One slide: a title placeholder followed by any extra shapes.
#[derive(Debug, Clone)]
pub struct FixtureSlide {
    title: String,
    shapes: Vec<FixtureShape>,
    notes: Option<String>,
}

impl FixtureSlide {
    pub fn untagged(title: &str) -> Self {
        Self {
            title: title.to_string(),
            shapes: Vec::new(),
            notes: None,
        }
    }

    /// Title plus a textbox named `Tag` holding `tag`.
    pub fn tagged(title: &str, tag: &str) -> Self {
        Self::untagged(title).with_text("Tag", tag)
    }

    pub fn with_text(mut self, name: &str, text: &str) -> Self {
        self.shapes.push(FixtureShape::Text {
            name: name.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Adds a picture of `ppt/media/image1.png`, which the master uses too.
    pub fn with_picture(self) -> Self {
        self.with_image("image1.png")
    }

    /// Adds a picture of `ppt/media/<file>`.
    pub fn with_image(mut self, file: &str) -> Self {
        self.shapes.push(FixtureShape::Picture(file.to_string()));
        self
    }

    /// Adds a textbox linking to slide `target` (1-based, in build order).
    pub fn with_link_to(mut self, target: usize) -> Self {
        self.shapes.push(FixtureShape::Link(target));
        self
    }

    pub fn with_notes(mut self, text: &str) -> Self {
        self.notes = Some(text.to_string());
        self
    }

    fn text_shape(id: usize, name: &str, text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            id,
            escape(name),
            escape(text)
        )
    }

    fn slide_xml(&self) -> String {
        let mut tree = format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            escape(self.title.as_str())
        );
        for (i, shape) in self.shapes.iter().enumerate() {
            let id = i + 3;
            match shape {
                FixtureShape::Text { name, text } => tree.push_str(&Self::text_shape(id, name, text)),
                FixtureShape::Link(_) => tree.push_str(&format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="Link"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="rId4" action="ppaction://hlinksldjump"/></a:rPr><a:t>Go</a:t></a:r></a:p></p:txBody></p:sp>"#,
                    id
                )),
                FixtureShape::Picture(_) => tree.push_str(&format!(
                    r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#,
                    id
                )),
            }
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            NS, tree
        )
    }

    fn image(&self) -> Option<&str> {
        self.shapes.iter().find_map(|s| match s {
            FixtureShape::Picture(file) => Some(file.as_str()),
            _ => None,
        })
    }

    fn link(&self) -> Option<usize> {
        self.shapes.iter().find_map(|s| match s {
            FixtureShape::Link(target) => Some(*target),
            _ => None,
        })
    }
}

/// A deck built from [`FixtureSlide`]s with one master, layout and theme.
#[derive(Debug, Clone)]
pub struct FixtureDeck {
    slides: Vec<FixtureSlide>,
}

fn rels(entries: &[(String, &str, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_NS, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn rel(id: usize, kind: &str, target: impl Into<String>) -> (String, &str, String) {
    (format!("rId{}", id), kind, target.into())
}

impl FixtureDeck {
    pub fn new(slides: Vec<FixtureSlide>) -> Self {
        Self { slides }
    }

    /// The package as `.pptx` bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        let mut media = vec!["ppt/media/image1.png".to_string()];
        let mut add = |name: &str, data: String| parts.push((name.to_string(), data.into_bytes()));

        add("[Content_Types].xml", self.content_types());
        add(
            "_rels/.rels",
            rels(&[rel(1, "officeDocument", "ppt/presentation.xml")]),
        );
        add("ppt/presentation.xml", self.presentation_xml());

        let count = self.slides.len();
        let mut pres_rels = vec![rel(1, "slideMaster", "slideMasters/slideMaster1.xml")];
        for i in 1..=count {
            pres_rels.push(rel(i + 1, "slide", format!("slides/slide{}.xml", i)));
        }
        pres_rels.push(rel(count + 2, "theme", "theme/theme1.xml"));
        add("ppt/_rels/presentation.xml.rels", rels(&pres_rels));

        let mut notes_count = 0;
        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            add(&format!("ppt/slides/slide{}.xml", n), slide.slide_xml());

            let mut slide_rels = vec![rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml")];
            if let Some(file) = slide.image() {
                slide_rels.push(rel(2, "image", format!("../media/{}", file)));
                let name = format!("ppt/media/{}", file);
                if !media.contains(&name) {
                    media.push(name);
                }
            }
            if let Some(target) = slide.link() {
                slide_rels.push(rel(4, "slide", format!("slide{}.xml", target)));
            }
            if let Some(ref notes) = slide.notes {
                notes_count += 1;
                slide_rels.push(rel(
                    3,
                    "notesSlide",
                    format!("../notesSlides/notesSlide{}.xml", notes_count),
                ));
                add(
                    &format!("ppt/notesSlides/notesSlide{}.xml", notes_count),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notes {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:notes>"#,
                        NS,
                        FixtureSlide::text_shape(2, "Notes Placeholder 1", notes)
                    ),
                );
                add(
                    &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", notes_count),
                    rels(&[rel(1, "slide", format!("../slides/slide{}.xml", n))]),
                );
            }
            add(&format!("ppt/slides/_rels/slide{}.xml.rels", n), rels(&slide_rels));
        }

        add(
            "ppt/slideLayouts/slideLayout1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {} type="title"><p:cSld name="Title Slide"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld></p:sldLayout>"#,
                NS
            ),
        );
        add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            rels(&[rel(1, "slideMaster", "../slideMasters/slideMaster1.xml")]),
        );
        add(
            "ppt/slideMasters/slideMaster1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:pic><p:nvPicPr><p:cNvPr id="2" name="Logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId3"/></p:blipFill><p:spPr/></p:pic></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
                NS
            ),
        );
        add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            rels(&[
                rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
                rel(2, "theme", "../theme/theme1.xml"),
                rel(3, "image", "../media/image1.png"),
            ]),
        );
        add(
            "ppt/theme/theme1.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements/></a:theme>"#
                .to_string(),
        );
        for name in media {
            parts.push((name, PIXEL.to_vec()));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, data) in &parts {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>"#,
        );
        let mut push = |part: String, kind: &str| {
            xml.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="{}.{}"/>"#,
                part, CT_PREFIX, kind
            ));
        };
        push("ppt/presentation.xml".into(), "presentationml.presentation.main+xml");
        push("ppt/slideMasters/slideMaster1.xml".into(), "presentationml.slideMaster+xml");
        push("ppt/slideLayouts/slideLayout1.xml".into(), "presentationml.slideLayout+xml");
        push("ppt/theme/theme1.xml".into(), "theme+xml");
        let mut notes = 0;
        for (i, slide) in self.slides.iter().enumerate() {
            push(format!("ppt/slides/slide{}.xml", i + 1), "presentationml.slide+xml");
            if slide.notes.is_some() {
                notes += 1;
                push(format!("ppt/notesSlides/notesSlide{}.xml", notes), "presentationml.notesSlide+xml");
            }
        }
        xml.push_str("</Types>");
        xml
    }

    fn presentation_xml(&self) -> String {
        let ids: String = (1..=self.slides.len())
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 1))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            NS, ids
        )
    }
}

#[test]
fn fixture_opens_as_package() {
    let bytes = FixtureDeck::new(vec![
        FixtureSlide::tagged("One", "both").with_notes("n"),
        FixtureSlide::untagged("Two").with_picture(),
    ])
    .build();
    let pkg = crate::package::Package::from_reader(Cursor::new(bytes)).unwrap();
    assert!(pkg.contains("ppt/notesSlides/notesSlide1.xml"));
    assert!(pkg.xml("ppt/presentation.xml").unwrap().contains(r#"<p:sldId id="257" r:id="rId3"/>"#));
}
