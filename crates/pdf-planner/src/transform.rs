//! Apply-transform executor backed by lopdf
//!
//! Produces new documents from a source and a [`TransformJob`]:
//! 1. Pages / range jobs rebuild the page tree with exactly the planned pages
//! 2. Merge concatenates sources after renumbering their objects
//! 3. Watermark appends a stamped content stream to every page
//! 4. Images builds a fresh document with one page per image
//! 5. Sign draws an image over a single page

use crate::constants::*;
use crate::job::{EntryJob, TransformJob};
use crate::options::{SignatureOptions, WatermarkOptions};
use crate::raster::{EmbeddedImage, embed_image};
use crate::types::*;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashSet;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Run `job` against the loaded sources and return the produced documents.
///
/// Sources are never modified. Any page index that does not exist in the
/// source at execution time is reported as [`PlannerError::TransformFailure`].
pub fn apply_transform(sources: &[Document], job: &TransformJob) -> Result<Vec<Document>> {
    let first = || {
        sources
            .first()
            .ok_or_else(|| PlannerError::TransformFailure("No source document loaded".to_string()))
    };

    match job {
        TransformJob::Pages(entries) => Ok(vec![build_from_entries(first()?, entries)?]),
        TransformJob::Ranges(ranges) => {
            let source = first()?;
            ranges
                .output_groups()
                .iter()
                .map(|group| build_from_entries(source, &EntryJob::from_ranges(group)))
                .collect()
        }
        TransformJob::Merge => Ok(vec![merge_documents(sources)?]),
        TransformJob::Watermark(options) => {
            let mut doc = first()?.clone();
            stamp_watermark(&mut doc, options)?;
            Ok(vec![doc])
        }
        TransformJob::Images(images) => Ok(vec![images_to_document(images)?]),
        TransformJob::Sign(options) => {
            let mut doc = first()?.clone();
            stamp_signature(&mut doc, options)?;
            Ok(vec![doc])
        }
    }
}

/// Same as [`apply_transform`], off the async executor
pub async fn apply_transform_async(
    sources: Vec<Document>,
    job: TransformJob,
) -> Result<Vec<Document>> {
    tokio::task::spawn_blocking(move || apply_transform(&sources, &job)).await?
}

// =============================================================================
// Page tree helpers
// =============================================================================

fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()?)
}

fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let id = current?;
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

/// Copy of the page dictionary with every inheritable attribute made explicit
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    for key in INHERITABLE_KEYS {
        if page.get(key).is_err() {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                page.set(key, value);
            }
        }
    }
    Ok(page)
}

fn page_rotation(page: &Dictionary) -> i64 {
    page.get(b"Rotate")
        .and_then(|r| r.as_i64())
        .unwrap_or(0)
}

/// Point `pages_id` at exactly `pages`, in order, and drop what became unreachable
fn rewrite_page_tree(
    doc: &mut Document,
    pages_id: ObjectId,
    pages: Vec<(ObjectId, Dictionary)>,
) -> Result<()> {
    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        doc.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }

    let mut root = doc.get_dictionary(pages_id)?.clone();
    root.set("Count", Object::Integer(kids.len() as i64));
    root.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(root));

    let pruned = doc.prune_objects();
    log::trace!("Pruned {} unreachable objects", pruned.len());
    Ok(())
}

// =============================================================================
// Jobs
// =============================================================================

fn build_from_entries(source: &Document, job: &EntryJob) -> Result<Document> {
    if job.is_empty() {
        return Err(PlannerError::TransformFailure(
            "Job contains no pages".to_string(),
        ));
    }

    let mut doc = source.clone();
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let pages_id = pages_root_id(&doc)?;

    // Read everything before touching the tree: duplicates must see the original page.
    let mut used = HashSet::new();
    let mut planned = Vec::with_capacity(job.len());
    for entry in job.entries() {
        let page_id = *page_ids.get(entry.source_index).ok_or_else(|| {
            PlannerError::TransformFailure(format!(
                "Page index {} does not exist (document has {} pages)",
                entry.source_index,
                page_ids.len()
            ))
        })?;

        let mut page = flatten_page(&doc, page_id)?;
        let rotation =
            (page_rotation(&page) + i64::from(entry.rotation.degrees())).rem_euclid(360);
        page.set("Rotate", Object::Integer(rotation));

        let target = if used.insert(page_id) {
            page_id
        } else {
            doc.new_object_id()
        };
        planned.push((target, page));
    }

    rewrite_page_tree(&mut doc, pages_id, planned)?;
    Ok(doc)
}

fn merge_documents(sources: &[Document]) -> Result<Document> {
    let (first, rest) = sources.split_first().ok_or_else(|| {
        PlannerError::TransformFailure("No documents to merge".to_string())
    })?;

    let mut merged = first.clone();
    let pages_id = pages_root_id(&merged)?;

    let mut pages = Vec::new();
    for page_id in merged.get_pages().into_values() {
        pages.push((page_id, flatten_page(&merged, page_id)?));
    }

    for source in rest {
        let mut source = source.clone();
        source.renumber_objects_with(merged.max_id + 1);

        for page_id in source.get_pages().into_values() {
            pages.push((page_id, flatten_page(&source, page_id)?));
        }

        merged.max_id = merged.max_id.max(source.max_id);
        merged.objects.extend(source.objects);
    }

    log::debug!("Merging {} documents into {} pages", sources.len(), pages.len());
    rewrite_page_tree(&mut merged, pages_id, pages)?;
    Ok(merged)
}

// =============================================================================
// Watermark
// =============================================================================

fn stamp_watermark(doc: &mut Document, options: &WatermarkOptions) -> Result<()> {
    options.validate()?;

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(font);

    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(options.opacity));
    gstate.set("CA", Object::Real(options.opacity));
    let gstate_id = doc.add_object(gstate);

    // Isolate the original content so its graphics state cannot leak into the stamp
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let mut page = flatten_page(doc, page_id)?;
        let (width, height) = page_size(doc, &page);

        let stamp = watermark_content(options, width, height).encode()?;
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), stamp));
        wrap_contents(doc, &mut page, save_id, stamp_id);

        let mut resources = resolve_dictionary(doc, page.get(b"Resources").ok())?;
        add_resource(doc, &mut resources, b"Font", WATERMARK_FONT_NAME, font_id)?;
        add_resource(doc, &mut resources, b"ExtGState", WATERMARK_GSTATE_NAME, gstate_id)?;
        page.set("Resources", Object::Dictionary(resources));

        doc.objects.insert(page_id, Object::Dictionary(page));
    }

    Ok(())
}

/// Content operations drawing the watermark text centred on the page
fn watermark_content(options: &WatermarkOptions, width: f32, height: f32) -> Content {
    let angle = options.angle_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    let text_width =
        options.text.chars().count() as f32 * options.font_size * HELVETICA_CHAR_WIDTH_RATIO;
    // Cap height is roughly 0.7em; shift down by half of it
    let half_height = options.font_size * 0.35;

    let x = width / 2.0 - (text_width / 2.0) * cos + half_height * sin;
    let y = height / 2.0 - (text_width / 2.0) * sin - half_height * cos;
    let (r, g, b) = options.color;

    Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(WATERMARK_GSTATE_NAME.as_bytes().to_vec())]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(WATERMARK_FONT_NAME.as_bytes().to_vec()),
                    Object::Real(options.font_size),
                ],
            ),
            Operation::new(
                "rg",
                vec![Object::Real(r), Object::Real(g), Object::Real(b)],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    options.text.as_bytes().to_vec(),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

// =============================================================================
// Overlay helpers
// =============================================================================

/// Surround the page's existing content with `save_id` and `stamp_id`
fn wrap_contents(doc: &Document, page: &mut Dictionary, save_id: ObjectId, stamp_id: ObjectId) {
    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents") {
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            _ => contents.push(Object::Reference(*id)),
        },
        Ok(other) => contents.push(other.clone()),
        Err(_) => {}
    }
    contents.push(Object::Reference(stamp_id));
    page.set("Contents", Object::Array(contents));
}

/// Operations painting image resource `name` into the given rectangle
fn image_operations(name: &str, x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(width),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height),
                Object::Real(x),
                Object::Real(y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

// =============================================================================
// Images and signatures
// =============================================================================

/// One page per image, each page exactly the image's pixel size in points
fn images_to_document(images: &[Vec<u8>]) -> Result<Document> {
    if images.is_empty() {
        return Err(PlannerError::TransformFailure(
            "No images to convert".to_string(),
        ));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(images.len());
    for bytes in images {
        let EmbeddedImage { id, width, height } = embed_image(&mut doc, bytes)?;
        let (w, h) = (width as f32, height as f32);

        let content = Content {
            operations: image_operations(PAGE_IMAGE_NAME, 0.0, 0.0, w, h),
        }
        .encode()?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut xobjects = Dictionary::new();
        xobjects.set(PAGE_IMAGE_NAME, Object::Reference(id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(width)),
                Object::Integer(i64::from(height)),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    log::debug!("Built {} page(s) from images", images.len());
    Ok(doc)
}

fn stamp_signature(doc: &mut Document, options: &SignatureOptions) -> Result<()> {
    options.validate()?;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let page_id = *page_ids.get(options.page).ok_or_else(|| {
        PlannerError::TransformFailure(format!(
            "Page index {} does not exist (document has {} pages)",
            options.page,
            page_ids.len()
        ))
    })?;

    let image = embed_image(doc, &options.image)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let mut operations = vec![Operation::new("Q", vec![])];
    operations.extend(image_operations(
        SIGNATURE_IMAGE_NAME,
        options.x,
        options.y,
        options.width,
        options.height,
    ));
    let stamp = Content { operations }.encode()?;
    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), stamp));

    let mut page = flatten_page(doc, page_id)?;
    wrap_contents(doc, &mut page, save_id, stamp_id);

    let mut resources = resolve_dictionary(doc, page.get(b"Resources").ok())?;
    add_resource(doc, &mut resources, b"XObject", SIGNATURE_IMAGE_NAME, image.id)?;
    page.set("Resources", Object::Dictionary(resources));

    doc.objects.insert(page_id, Object::Dictionary(page));
    log::debug!("Signed page {}", options.page + 1);
    Ok(())
}

// =============================================================================
// Page and resource helpers
// =============================================================================

fn page_size(doc: &Document, page: &Dictionary) -> (f32, f32) {
    let media_box = match page.get(b"MediaBox") {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok(),
        Ok(other) => Some(other),
        Err(_) => None,
    };

    let numbers: Option<Vec<f32>> = media_box
        .and_then(|mb| mb.as_array().ok())
        .map(|arr| arr.iter().filter_map(number).collect());

    match numbers.as_deref() {
        Some([llx, lly, urx, ury]) => ((urx - llx).abs(), (ury - lly).abs()),
        _ => (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn resolve_dictionary(doc: &Document, obj: Option<&Object>) -> Result<Dictionary> {
    Ok(match obj {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    })
}

/// Register `id` under `/category/name` in a page resource dictionary
fn add_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    id: ObjectId,
) -> Result<()> {
    let mut entries = resolve_dictionary(doc, resources.get(category).ok())?;
    entries.set(name.as_bytes(), Object::Reference(id));
    resources.set(category, Object::Dictionary(entries));
    Ok(())
}
