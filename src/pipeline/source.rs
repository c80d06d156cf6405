//! The PDF collaborator: everything the engine asks of the input document.
//!
//! ## Why a trait?
//!
//! The engine's logic is a pure function of page text and page images; pdfium
//! is an implementation detail behind [`PageSource`]. That seam is what lets
//! the classification, span and reconciliation passes be tested against
//! scripted page streams without a native library in the loop, and keeps
//! every pdfium call in one file.
//!
//! ## Why is every method fallible per page?
//!
//! Scanned bundles carry damaged streams more often than clean corpora. A
//! page whose text layer is broken must not kill the run: the engine recovers
//! render and text failures (the page stays accounted, with empty signals)
//! and only copy failures surface, as per-document errors.

use crate::error::{SegmentError, SourceError};
use crate::output::PdfInfo;
use crate::pipeline::state::TextCache;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::warn;

/// What the segmentation engine needs from an open PDF.
///
/// Page indices are 0-based everywhere; implementations translate to their
/// backend's own numbering.
pub trait PageSource {
    /// Total number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterise one page at the width the source was opened with.
    fn render_page(&self, page: usize) -> Result<DynamicImage, SourceError>;

    /// Extract the text layer of one page.
    fn extract_text(&self, page: usize) -> Result<String, SourceError>;

    /// Copy an inclusive page range into a fresh single-document PDF and
    /// return its bytes.
    fn copy_pages(&self, pages: RangeInclusive<usize>) -> Result<Vec<u8>, SourceError>;
}

/// Cached text lookup with the engine's recovery rule baked in: an extraction
/// failure is logged once and the page reads as empty from then on.
pub(crate) fn cached_text<'a>(
    cache: &'a mut TextCache,
    source: &dyn PageSource,
    page: usize,
) -> &'a str {
    cache.get_or_extract(page, || match source.extract_text(page) {
        Ok(text) => text,
        Err(err) => {
            warn!(page, error = %err, "text extraction failed; treating page as empty");
            String::new()
        }
    })
}

// ── pdfium-backed implementation ─────────────────────────────────────────

/// Bind to a pdfium shared library.
///
/// Search order: the directory named by `PDFIUM_DYNAMIC_LIB_PATH`, then the
/// process working directory, then the system library path.
pub(crate) fn bind_pdfium() -> Result<Pdfium, SegmentError> {
    let search_dir =
        std::env::var("PDFIUM_DYNAMIC_LIB_PATH").unwrap_or_else(|_| "./".to_string());
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&search_dir))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SegmentError::PdfiumBinding(format!("{e:?}")))
}

/// Open a document, translating pdfium's failure into the user-facing error.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, SegmentError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                SegmentError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                SegmentError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            SegmentError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read document facts without running segmentation.
///
/// Blocking: call from `spawn_blocking` in async contexts.
pub(crate) fn inspect_blocking(path: &Path, password: Option<&str>) -> Result<PdfInfo, SegmentError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(PdfInfo {
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        // pdfium does not expose the encryption flag after a successful
        // open; a provided password is the reliable signal.
        encrypted: password.is_some(),
    })
}

/// 1-based page range in pdfium's `copy_pages_from_document` notation.
pub(crate) fn page_range_spec(first: usize, last: usize) -> String {
    if first == last {
        format!("{}", first + 1)
    } else {
        format!("{}-{}", first + 1, last + 1)
    }
}

/// [`PageSource`] over an open pdfium document.
///
/// Holds the binding by reference so page copies can create sibling
/// documents from the same library handle. All pdfium calls are blocking;
/// the async entry points wrap the whole run in `spawn_blocking`.
pub struct PdfiumSource<'a> {
    pdfium: &'a Pdfium,
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PdfiumSource<'a> {
    /// Open `path` and prepare rendering at `render_width` pixels.
    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
        render_width: u32,
    ) -> Result<Self, SegmentError> {
        let document = open_document(pdfium, path, password)?;
        let render_config = PdfRenderConfig::new()
            .set_target_width(render_width as i32)
            .set_maximum_height(render_width as i32 * 4);
        Ok(Self {
            pdfium,
            document,
            render_config,
        })
    }
}

impl PageSource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, page: usize) -> Result<DynamicImage, SourceError> {
        let pdf_page = self
            .document
            .pages()
            .get(page as u16)
            .map_err(|e| SourceError::Render {
                page,
                detail: format!("{:?}", e),
            })?;
        let bitmap = pdf_page
            .render_with_config(&self.render_config)
            .map_err(|e| SourceError::Render {
                page,
                detail: format!("{:?}", e),
            })?;
        Ok(bitmap.as_image())
    }

    fn extract_text(&self, page: usize) -> Result<String, SourceError> {
        let pdf_page = self
            .document
            .pages()
            .get(page as u16)
            .map_err(|e| SourceError::Text {
                page,
                detail: format!("{:?}", e),
            })?;
        let text = pdf_page.text().map_err(|e| SourceError::Text {
            page,
            detail: format!("{:?}", e),
        })?;
        Ok(text.all())
    }

    fn copy_pages(&self, pages: RangeInclusive<usize>) -> Result<Vec<u8>, SourceError> {
        let (first, last) = (*pages.start(), *pages.end());
        let copy_err = |e: PdfiumError| SourceError::Copy {
            first,
            last,
            detail: format!("{:?}", e),
        };

        let mut target = self.pdfium.create_new_pdf().map_err(copy_err)?;
        target
            .pages_mut()
            .copy_pages_from_document(&self.document, &page_range_spec(first, last), 0)
            .map_err(copy_err)?;
        target.save_to_bytes().map_err(copy_err)
    }
}

// ── Scripted source for tests ────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use image::{Rgb, RgbImage};

    #[derive(Default)]
    struct FakePage {
        text: String,
        blank: bool,
        fail_text: bool,
        fail_render: bool,
    }

    /// A [`PageSource`] driven entirely by scripted page texts. Blank pages
    /// render pure white; content pages carry a dark block; failures are
    /// injected per page or for copies.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pages: Vec<FakePage>,
        fail_copy: bool,
    }

    impl ScriptedSource {
        pub(crate) fn from_texts(texts: &[&str]) -> Self {
            Self {
                pages: texts
                    .iter()
                    .map(|t| FakePage {
                        text: t.to_string(),
                        ..FakePage::default()
                    })
                    .collect(),
                fail_copy: false,
            }
        }

        /// Make `page` render pure white (and read as empty text).
        pub(crate) fn blank(mut self, page: usize) -> Self {
            self.pages[page].blank = true;
            self.pages[page].text.clear();
            self
        }

        pub(crate) fn fail_text_on(mut self, page: usize) -> Self {
            self.pages[page].fail_text = true;
            self
        }

        pub(crate) fn fail_render_on(mut self, page: usize) -> Self {
            self.pages[page].fail_render = true;
            self
        }

        pub(crate) fn fail_copies(mut self) -> Self {
            self.fail_copy = true;
            self
        }
    }

    impl PageSource for ScriptedSource {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn render_page(&self, page: usize) -> Result<DynamicImage, SourceError> {
            let spec = &self.pages[page];
            if spec.fail_render {
                return Err(SourceError::Render {
                    page,
                    detail: "scripted render failure".into(),
                });
            }
            let mut img = RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]));
            if !spec.blank {
                for y in 0..8 {
                    for x in 0..8 {
                        img.put_pixel(x, y, Rgb([0, 0, 0]));
                    }
                }
            }
            Ok(DynamicImage::ImageRgb8(img))
        }

        fn extract_text(&self, page: usize) -> Result<String, SourceError> {
            let spec = &self.pages[page];
            if spec.fail_text {
                return Err(SourceError::Text {
                    page,
                    detail: "scripted text failure".into(),
                });
            }
            Ok(spec.text.clone())
        }

        fn copy_pages(&self, pages: RangeInclusive<usize>) -> Result<Vec<u8>, SourceError> {
            let (first, last) = (*pages.start(), *pages.end());
            if self.fail_copy {
                return Err(SourceError::Copy {
                    first,
                    last,
                    detail: "scripted copy failure".into(),
                });
            }
            Ok(format!("%FAKEPDF pages {first}-{last}").into_bytes())
        }
    }
}
