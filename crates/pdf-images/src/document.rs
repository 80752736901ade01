//! PDF document backend
//!
//! The pipeline only talks to [`PdfBackend`]; [`LopdfBackend`] is the
//! implementation that produces real documents.

use crate::decode::EncodedImage;
use crate::layout::{PageSpec, Placement, mm_to_pt};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// Page-oriented drawing surface.
///
/// A backend starts with one empty page. Images are always drawn on the
/// last page.
pub trait PdfBackend {
    /// Append a new page and make it current
    fn add_page(&mut self) -> Result<()>;

    /// Draw an image on the current page
    fn draw_image(&mut self, image: &EncodedImage, placement: &Placement) -> Result<()>;

    fn page_count(&self) -> usize;
}

#[derive(Default)]
struct PendingPage {
    content: String,
    xobjects: Dictionary,
}

/// Builds a PDF document with lopdf
pub struct LopdfBackend {
    doc: Document,
    page: PageSpec,
    pages_tree_id: ObjectId,
    pages: Vec<PendingPage>,
    image_count: usize,
    title: Option<String>,
}

impl LopdfBackend {
    pub fn new(page: PageSpec) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_tree_id = doc.new_object_id();
        Self {
            doc,
            page,
            pages_tree_id,
            pages: vec![PendingPage::default()],
            image_count: 0,
            title: None,
        }
    }

    /// Set the document title written to the info dictionary
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Assemble the page tree and catalog
    pub fn finish(mut self) -> Result<Document> {
        let width_pt = mm_to_pt(self.page.page_width);
        let height_pt = mm_to_pt(self.page.page_height);

        let mut page_refs = Vec::with_capacity(self.pages.len());
        for pending in std::mem::take(&mut self.pages) {
            let content_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), pending.content.into_bytes()));

            let mut resources = Dictionary::new();
            if !pending.xobjects.is_empty() {
                resources.set("XObject", Object::Dictionary(pending.xobjects));
            }

            let page_id = self.doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(self.pages_tree_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(width_pt),
                        Object::Real(height_pt),
                    ]),
                ),
                ("Resources", Object::Dictionary(resources)),
                ("Contents", Object::Reference(content_id)),
            ]));
            page_refs.push(Object::Reference(page_id));
        }

        let count = page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_tree_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_tree_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        let mut info = Dictionary::new();
        info.set("Producer", Object::string_literal("img2pdf"));
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        Ok(self.doc)
    }

    fn add_image_xobject(&mut self, image: &EncodedImage) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(image.width_px as i64));
        dict.set("Height", Object::Integer(image.height_px as i64));
        dict.set(
            "ColorSpace",
            Object::Name(image.color_space.pdf_name().as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set(
            "Filter",
            Object::Name(image.filter.pdf_name().as_bytes().to_vec()),
        );

        if let Some(mask) = &image.soft_mask {
            let mask_id = self.doc.add_object(Stream::new(
                Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"XObject".to_vec())),
                    ("Subtype", Object::Name(b"Image".to_vec())),
                    ("Width", Object::Integer(image.width_px as i64)),
                    ("Height", Object::Integer(image.height_px as i64)),
                    ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                    ("BitsPerComponent", Object::Integer(8)),
                    ("Filter", Object::Name(b"FlateDecode".to_vec())),
                ]),
                mask.clone(),
            ));
            dict.set("SMask", Object::Reference(mask_id));
        }

        // Data is already compressed with the filter named above
        let stream = Stream::new(dict, image.data.clone()).with_compression(false);
        self.doc.add_object(stream)
    }
}

impl PdfBackend for LopdfBackend {
    fn add_page(&mut self) -> Result<()> {
        self.pages.push(PendingPage::default());
        Ok(())
    }

    fn draw_image(&mut self, image: &EncodedImage, placement: &Placement) -> Result<()> {
        let xobject_id = self.add_image_xobject(image);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let (x, y, width, height) = placement.to_pdf_rect(&self.page);
        let current = self
            .pages
            .last_mut()
            .ok_or_else(|| ConvertError::Config("document has no pages".to_string()))?;
        current
            .xobjects
            .set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
        current.content.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            width, height, x, y, name
        ));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Serialize a document to bytes
pub async fn pdf_bytes(mut doc: Document) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, ConvertError>(writer)
    })
    .await?
}

/// Save a document to disk
pub async fn save_pdf(doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = pdf_bytes(doc).await?;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}
