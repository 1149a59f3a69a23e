#[cfg(test)]
mod tests;

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::{DocChatError, Result};

/// File extensions the loader recognizes.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "docx"];

/// A raw text document extracted from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub text: String,
    /// Name of the original upload, kept as provenance on every chunk.
    pub source_filename: String,
}

/// An uploaded file: a name and its bytes. Implemented by the disk adapter
/// used for bootstrap ingestion and by the in-memory adapter used for
/// uploads and tests.
pub trait FileUpload {
    fn name(&self) -> &str;
    fn read(&self) -> Result<Vec<u8>>;
}

/// Disk-backed upload, used when ingesting pre-placed tenant documents.
#[derive(Debug, Clone)]
pub struct DiskFile {
    name: String,
    path: PathBuf,
}

impl DiskFile {
    #[inline]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

impl FileUpload for DiskFile {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

/// In-memory upload, used for user-submitted files and tests.
#[derive(Debug, Clone)]
pub struct MemoryUpload {
    name: String,
    bytes: Vec<u8>,
}

impl MemoryUpload {
    #[inline]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl FileUpload for MemoryUpload {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn read(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Lowercased extension of a filename, if any.
#[inline]
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Whether the loader can handle this filename.
#[inline]
pub fn is_supported(filename: &str) -> bool {
    file_extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Convert one uploaded file into raw text documents.
///
/// All three parsers operate on the in-memory bytes of the upload, so no
/// temporary file exists to leak on any exit path. Parse failures propagate
/// as [`DocChatError::DocumentParse`]; unrecognized extensions as
/// [`DocChatError::UnsupportedFileType`].
#[inline]
pub fn load_document(file: &dyn FileUpload) -> Result<Vec<RawDocument>> {
    let filename = file.name().to_string();
    let extension = file_extension(&filename)
        .ok_or_else(|| DocChatError::UnsupportedFileType(filename.clone()))?;

    let bytes = file.read()?;
    debug!(file = %filename, bytes = bytes.len(), "Loading document");

    let text = match extension.as_str() {
        "pdf" => extract_pdf_text(&bytes, &filename)?,
        "txt" => extract_plain_text(&bytes, &filename)?,
        "docx" => extract_docx_text(&bytes, &filename)?,
        _ => return Err(DocChatError::UnsupportedFileType(filename)),
    };

    Ok(vec![RawDocument {
        text,
        source_filename: filename,
    }])
}

fn extract_pdf_text(bytes: &[u8], filename: &str) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocChatError::DocumentParse {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

fn extract_plain_text(bytes: &[u8], filename: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| DocChatError::DocumentParse {
        filename: filename.to_string(),
        reason: format!("not valid UTF-8: {}", e),
    })
}

/// A .docx file is a zip archive; the document body lives in
/// `word/document.xml`. Collect the text runs and emit a newline per
/// paragraph.
fn extract_docx_text(bytes: &[u8], filename: &str) -> Result<String> {
    let parse_err = |reason: String| DocChatError::DocumentParse {
        filename: filename.to_string(),
        reason,
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| parse_err(format!("not a valid docx archive: {}", e)))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| parse_err(format!("missing word/document.xml: {}", e)))?
        .read_to_string(&mut document_xml)
        .map_err(|e| parse_err(format!("unreadable word/document.xml: {}", e)))?;

    let mut reader = Reader::from_str(&document_xml);
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| parse_err(format!("invalid XML text: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::End(end)) if end.name().as_ref() == b"w:p" => {
                text.push('\n');
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_err(format!("invalid document XML: {}", e))),
        }
    }

    Ok(text)
}
