//! Small helpers over quick-xml for reading and editing package parts.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// What to do with an event while rewriting a document.
pub(crate) enum Edit {
    /// Write the event unchanged.
    Keep,
    /// Drop the event; a start tag takes its whole subtree with it.
    Drop,
    /// Write these events, then the current one.
    Before(Vec<Event<'static>>),
    /// Write the current event, then these.
    After(Vec<Event<'static>>),
    /// Write these events instead of the current one (start tags take their
    /// subtree with them).
    Replace(Vec<Event<'static>>),
}

/// Stream `xml` through `edit` and return the rewritten document.
///
/// `edit` receives each event together with its depth: the number of
/// elements enclosing it. A start tag, its empty form and its end tag all
/// report the same depth.
pub(crate) fn rewrite<F>(xml: &str, mut edit: F) -> Result<String>
where
    F: FnMut(&Event<'_>, usize) -> Edit,
{
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut depth = 0usize;
    let mut skipping: Option<usize> = None;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        if matches!(event, Event::Eof) {
            break;
        }

        if let Some(start) = skipping {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == start {
                        skipping = None;
                    }
                }
                _ => {}
            }
            continue;
        }

        let is_start = matches!(event, Event::Start(_));
        if matches!(event, Event::End(_)) {
            depth = depth.saturating_sub(1);
        }

        match edit(&event, depth) {
            Edit::Keep => write(&mut writer, event)?,
            Edit::Drop => {
                if is_start {
                    skipping = Some(depth);
                }
            }
            Edit::Before(events) => {
                for e in events {
                    write(&mut writer, e)?;
                }
                write(&mut writer, event)?;
            }
            Edit::After(events) => {
                write(&mut writer, event)?;
                for e in events {
                    write(&mut writer, e)?;
                }
            }
            Edit::Replace(events) => {
                for e in events {
                    write(&mut writer, e)?;
                }
                if is_start {
                    skipping = Some(depth);
                }
            }
        }

        if is_start {
            depth += 1;
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::XmlError(format!("Rewritten part is not UTF-8: {}", e)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(xml_error)
}

pub(crate) fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// The namespace prefix of an element name, if any.
pub(crate) fn prefix(name: &[u8]) -> Option<&str> {
    let pos = name.iter().position(|&b| b == b':')?;
    std::str::from_utf8(&name[..pos]).ok()
}

/// Local name of a start or empty tag.
pub(crate) fn element_name<'e>(e: &'e BytesStart<'_>) -> &'e [u8] {
    local_name(e.name().into_inner())
}

/// Unescaped value of the attribute whose full key is `key`.
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Unescaped value of the first attribute whose local name is `local` and
/// that carries a namespace prefix (e.g. `r:id`).
pub(crate) fn prefixed_attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| {
            let key = a.key.as_ref();
            key.contains(&b':') && local_name(key) == local
        })
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Join an optional prefix and a local name.
pub(crate) fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, local),
        None => local.to_string(),
    }
}
