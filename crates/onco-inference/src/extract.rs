//! PDF text extraction for uploaded reports.

use std::path::Path;

use onco_core::CoreError;

/// Concatenates the text of every page. Pages without extractable text
/// contribute nothing; only a document the parser cannot read is an error.
pub fn extract_pdf_text(path: &Path) -> Result<String, CoreError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CoreError::Extraction(format!("failed to read {}: {e}", path.display())))?;
    extract_pdf_text_from_bytes(&bytes)
}

pub fn extract_pdf_text_from_bytes(bytes: &[u8]) -> Result<String, CoreError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| CoreError::Extraction(e.to_string()))?;
    Ok(pages.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a one-page PDF with embedded text via lopdf (the library
    /// pdf-extract uses internally).
    fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_stream = Stream::new(dictionary! {}, content.into_bytes());
        let content_id = doc.add_object(content_stream);

        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn embedded_text_is_extracted() {
        let pdf = make_test_pdf("Hemoglobin 11.2 g/dL");
        let text = extract_pdf_text_from_bytes(&pdf).unwrap();
        assert!(text.contains("Hemoglobin 11.2 g/dL"));
    }

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let err = extract_pdf_text_from_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, CoreError::Extraction(_)));
    }
}
