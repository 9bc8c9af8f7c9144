//! In-memory OPC package: every ZIP entry of a `.pptx`, editable by name.

use crate::xml::{attr, element_name, rewrite, Edit};
use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the content types part.
pub const CONTENT_TYPES: &str = "[Content_Types].xml";

/// Content type of a slide part.
pub const SLIDE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// All parts of a package, keyed by part name without a leading slash.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Read a package from a file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.insert(name, data);
        }

        if !parts.contains_key(CONTENT_TYPES) {
            return Err(Error::CorruptedFile(format!("missing {}", CONTENT_TYPES)));
        }
        Ok(Self { parts })
    }

    /// Write the package to a file, replacing it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the package as a ZIP archive, content types first.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name.as_str() == CONTENT_TYPES)
            .chain(self.parts.iter().filter(|(name, _)| name.as_str() != CONTENT_TYPES));

        for (name, data) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|d| d.as_slice())
    }

    /// A part decoded as UTF-8 XML.
    pub fn xml(&self, name: &str) -> Result<String> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::CorruptedFile(format!("part '{}' not found", name)))?;
        String::from_utf8(data.to_vec())
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .map_err(|e| Error::CorruptedFile(format!("part '{}' is not UTF-8: {}", name, e)))
    }

    pub fn set_part(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), data.into());
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|k| k.as_str())
    }

    /// The `Override` content type registered for a part.
    pub fn content_type_override(&self, name: &str) -> Result<Option<String>> {
        let xml = self.xml(CONTENT_TYPES)?;
        let part_name = format!("/{}", name);
        let mut found = None;
        rewrite(&xml, |event, _| {
            if let Event::Empty(e) | Event::Start(e) = event {
                if found.is_none()
                    && element_name(e) == b"Override"
                    && attr(e, b"PartName").is_some_and(|p| p.eq_ignore_ascii_case(&part_name))
                {
                    found = attr(e, b"ContentType");
                }
            }
            Edit::Keep
        })?;
        Ok(found)
    }

    /// Register `content_type` for a part, replacing any previous override.
    pub fn set_override(&mut self, name: &str, content_type: &str) -> Result<()> {
        self.remove_override(name)?;
        let xml = self.xml(CONTENT_TYPES)?;
        let part_name = format!("/{}", name);

        let updated = rewrite(&xml, |event, depth| match event {
            Event::End(_) if depth == 0 => {
                let mut element = BytesStart::new("Override");
                element.push_attribute(("PartName", part_name.as_str()));
                element.push_attribute(("ContentType", content_type));
                Edit::Before(vec![Event::Empty(element.into_owned())])
            }
            _ => Edit::Keep,
        })?;
        self.set_part(CONTENT_TYPES, updated);
        Ok(())
    }

    /// Drop the `Override` registered for a part, if any.
    pub fn remove_override(&mut self, name: &str) -> Result<()> {
        let xml = self.xml(CONTENT_TYPES)?;
        let part_name = format!("/{}", name);

        let updated = rewrite(&xml, |event, _| match event {
            Event::Empty(e) | Event::Start(e)
                if element_name(e) == b"Override"
                    && attr(e, b"PartName").is_some_and(|p| p.eq_ignore_ascii_case(&part_name)) =>
            {
                Edit::Drop
            }
            _ => Edit::Keep,
        })?;
        self.set_part(CONTENT_TYPES, updated);
        Ok(())
    }
}
