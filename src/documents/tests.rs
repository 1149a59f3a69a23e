use super::*;
use std::io::Write;
use tempfile::TempDir;

fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document_xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><w:document><w:body>{}</w:body></w:document>",
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .expect("should start zip entry");
    writer
        .write_all(document_xml.as_bytes())
        .expect("should write zip entry");
    writer.finish().expect("should finish zip").into_inner()
}

#[test]
fn loads_plain_text_upload() {
    let upload = MemoryUpload::new("notes.txt", b"refund policy is 7 days".to_vec());
    let documents = load_document(&upload).expect("should load txt");

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].text, "refund policy is 7 days");
    assert_eq!(documents[0].source_filename, "notes.txt");
}

#[test]
fn rejects_unsupported_extension() {
    let upload = MemoryUpload::new("data.csv", b"a,b,c".to_vec());
    let err = load_document(&upload).expect_err("csv should be rejected");
    assert!(matches!(err, DocChatError::UnsupportedFileType(_)));
}

#[test]
fn rejects_file_without_extension() {
    let upload = MemoryUpload::new("README", b"hello".to_vec());
    let err = load_document(&upload).expect_err("no extension should be rejected");
    assert!(matches!(err, DocChatError::UnsupportedFileType(_)));
}

#[test]
fn extension_matching_is_case_insensitive() {
    let upload = MemoryUpload::new("NOTES.TXT", b"office hours 9 to 6".to_vec());
    let documents = load_document(&upload).expect("should load uppercase txt");
    assert_eq!(documents[0].text, "office hours 9 to 6");

    assert!(is_supported("Report.PDF"));
    assert!(!is_supported("archive.tar.gz"));
}

#[test]
fn invalid_utf8_text_is_a_parse_error() {
    let upload = MemoryUpload::new("broken.txt", vec![0xff, 0xfe, 0x00]);
    let err = load_document(&upload).expect_err("invalid utf8 should fail");
    assert!(matches!(err, DocChatError::DocumentParse { .. }));
}

#[test]
fn loads_docx_paragraphs() {
    let bytes = build_docx(&["First paragraph.", "Second paragraph."]);
    let upload = MemoryUpload::new("handbook.docx", bytes);

    let documents = load_document(&upload).expect("should load docx");
    assert_eq!(documents.len(), 1);
    assert!(documents[0].text.contains("First paragraph."));
    assert!(documents[0].text.contains("Second paragraph."));
    // Paragraph boundary preserved as a line break
    assert!(
        documents[0]
            .text
            .find("First paragraph.")
            .expect("should find first paragraph")
            < documents[0]
                .text
                .find('\n')
                .expect("should contain newline")
    );
}

#[test]
fn corrupt_docx_is_a_parse_error() {
    let upload = MemoryUpload::new("corrupt.docx", b"this is not a zip archive".to_vec());
    let err = load_document(&upload).expect_err("corrupt docx should fail");
    assert!(matches!(err, DocChatError::DocumentParse { .. }));
}

#[test]
fn corrupt_pdf_is_a_parse_error() {
    let upload = MemoryUpload::new("corrupt.pdf", b"%PDF-1.7 truncated garbage".to_vec());
    let err = load_document(&upload).expect_err("corrupt pdf should fail");
    assert!(matches!(err, DocChatError::DocumentParse { .. }));
}

#[test]
fn disk_file_adapter_reads_from_path() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("faq.txt");
    std::fs::write(&path, "shipping takes 3 days").expect("should write file");

    let file = DiskFile::new(&path);
    assert_eq!(file.name(), "faq.txt");

    let documents = load_document(&file).expect("should load from disk");
    assert_eq!(documents[0].text, "shipping takes 3 days");
    assert_eq!(documents[0].source_filename, "faq.txt");
}
