//! Atom entry document writer for post creation.
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use super::NS_ATOM;
use crate::service::PostDraft;

/// Errors from serializing an entry document.
#[derive(Debug, Error)]
pub enum EntryWriteError {
    #[error("Failed to write XML: {0}")]
    Xml(String),

    #[error("Serialized entry is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a [`PostDraft`] into the Atom `<entry>` payload the Blogs
/// API expects on entry creation. Text content is escaped by the writer.
pub fn entry_document(draft: &PostDraft) -> Result<String, EntryWriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut entry = BytesStart::new("entry");
    entry.push_attribute(("xmlns", NS_ATOM));
    write(&mut writer, Event::Start(entry))?;

    text_element(&mut writer, "title", "text", &draft.title)?;
    if let Some(summary) = &draft.summary {
        text_element(&mut writer, "summary", "html", summary)?;
    }
    text_element(&mut writer, "content", "html", &draft.content)?;

    for tag in &draft.tags {
        let mut category = BytesStart::new("category");
        category.push_attribute(("term", tag.as_str()));
        write(&mut writer, Event::Empty(category))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("entry")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EntryWriteError> {
    writer
        .write_event(event)
        .map_err(|e| EntryWriteError::Xml(e.to_string()))
}

fn text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    media_type: &str,
    text: &str,
) -> Result<(), EntryWriteError> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("type", media_type));
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PostDraft {
        PostDraft {
            title: "Release <notes>".to_string(),
            content: "<p>Hello & welcome</p>".to_string(),
            summary: Some("Short version".to_string()),
            tags: vec!["announcements".to_string(), "team".to_string()],
        }
    }

    #[test]
    fn test_entry_document_structure() {
        let xml = entry_document(&draft()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<entry xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(xml.contains("<summary type=\"html\">Short version</summary>"));
        assert!(xml.contains("<category term=\"announcements\"/>"));
        assert!(xml.contains("<category term=\"team\"/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = entry_document(&draft()).unwrap();
        assert!(xml.contains("Release &lt;notes&gt;"));
        assert!(xml.contains("&lt;p&gt;Hello &amp; welcome&lt;/p&gt;"));
    }

    #[test]
    fn test_summary_omitted_when_absent() {
        let mut d = draft();
        d.summary = None;
        let xml = entry_document(&d).unwrap();
        assert!(!xml.contains("<summary"));
    }

    #[test]
    fn test_document_round_trips_through_xml_parser() {
        let xml = entry_document(&draft()).unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "entry");
        assert_eq!(root.tag_name().namespace(), Some(NS_ATOM));
    }
}
