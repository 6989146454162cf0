//! Paginated PDF export: a cover section, then one section per recorded day
//! with its metrics, notes and photos.
//!
//! All data (including photos) is loaded first; the document is then laid out
//! in one synchronous pass and page numbers are stamped once the page count
//! is known.

use std::collections::HashMap;
use std::io::BufWriter;

use diary_store::{DayFilter, DayId, Note, SymptomType, UserId};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use tracing::{debug, warn};

use crate::ReportEngine;
use crate::assembly::Assembled;
use crate::dates::{LocalCalendar, to_date_key};
use crate::error::{ReportError, ReportResult};
use crate::export::layout::{
    Cursor, MM_PER_PT, PageGeometry, line_height_mm, pack_rows, page_label, photo_display_size, text_width_mm,
    wrap_text,
};
use crate::export::photos::{PhotoSource, Thumbnail, load_thumbnail};

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const PHOTO_GAP: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdfOptions {
    pub photos: bool,
    /// Longest photo edge in pixels.
    pub thumb: u32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            photos: true,
            thumb: Self::DEFAULT_THUMB,
        }
    }
}

impl PdfOptions {
    pub const DEFAULT_THUMB: u32 = 500;
    pub const MIN_THUMB: u32 = 50;
    pub const MAX_THUMB: u32 = 1000;

    /// Lenient parsing of the `photos` and `thumb` query values.
    pub fn from_params(photos: Option<&str>, thumb: Option<&str>) -> Self {
        let photos = !matches!(photos, Some("false") | Some("0"));
        let thumb = thumb
            .and_then(|t| t.trim().parse::<u32>().ok())
            .unwrap_or(Self::DEFAULT_THUMB)
            .clamp(Self::MIN_THUMB, Self::MAX_THUMB);
        Self { photos, thumb }
    }
}

#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub photos_embedded: usize,
    pub photo_fallbacks: usize,
}

enum PhotoSlot {
    Embedded(Thumbnail),
    Fallback(String),
}

struct NoteBlock {
    time: String,
    text: Option<String>,
    photos: Vec<PhotoSlot>,
    skipped_photos: usize,
}

pub async fn export_pdf(
    engine: &ReportEngine,
    user: UserId,
    filter: &DayFilter,
    options: PdfOptions,
    photos: &dyn PhotoSource,
) -> ReportResult<RenderedPdf> {
    let assembled = engine.assemble(user, filter).await?;
    let day_ids = assembled.day_ids();
    let mut notes = if day_ids.is_empty() {
        Vec::new()
    } else {
        engine.store().list_notes(&day_ids).await?
    };
    notes.sort_by_key(|n| n.created_at);
    let mut notes_by_day: HashMap<DayId, Vec<NoteBlock>> = HashMap::new();
    for note in notes {
        let (day_id, block) = load_note(engine.calendar(), note, options, photos).await;
        notes_by_day.entry(day_id).or_default().push(block);
    }

    let rendered = render(engine.calendar(), &assembled, &notes_by_day)?;
    debug!(
        %user,
        days = assembled.days.len(),
        pages = rendered.page_count,
        photos = rendered.photos_embedded,
        fallbacks = rendered.photo_fallbacks,
        "rendered pdf export"
    );
    Ok(rendered)
}

async fn load_note(
    calendar: &LocalCalendar,
    note: Note,
    options: PdfOptions,
    source: &dyn PhotoSource,
) -> (DayId, NoteBlock) {
    let mut slots = Vec::new();
    let skipped_photos = if options.photos {
        for url in &note.photo_urls {
            match load_thumbnail(source, url, options.thumb).await {
                Ok(thumb) => slots.push(PhotoSlot::Embedded(thumb)),
                Err(e) => {
                    warn!(photo = %display_reference(url), error = %e, "photo not embedded, falling back to its url");
                    slots.push(PhotoSlot::Fallback(display_reference(url)));
                }
            }
        }
        0
    } else {
        note.photo_urls.len()
    };

    let block = NoteBlock {
        time: calendar.local_time(note.created_at),
        text: note.text.filter(|t| !t.trim().is_empty()),
        photos: slots,
        skipped_photos,
    };
    (note.day_id, block)
}

/// Printable form of a photo reference. Inline data URIs are shortened.
fn display_reference(url: &str) -> String {
    const MAX_INLINE: usize = 48;
    if url.starts_with("data:") && url.len() > MAX_INLINE {
        let head: String = url.chars().take(MAX_INLINE).collect();
        format!("{head}...")
    } else {
        url.to_string()
    }
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    geometry: PageGeometry,
    cursor: Cursor,
    current: PdfLayerReference,
    layers: Vec<PdfLayerReference>,
    photos_embedded: usize,
    photo_fallbacks: usize,
}

impl PdfWriter {
    fn new(title: &str) -> ReportResult<Self> {
        let geometry = PageGeometry::A4;
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(geometry.width),
            Mm(geometry.height),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("font: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("font: {e}")))?;
        let first = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            font,
            bold,
            geometry,
            cursor: Cursor::new(geometry),
            current: first.clone(),
            layers: vec![first],
            photos_embedded: 0,
            photo_fallbacks: 0,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(self.geometry.width),
            Mm(self.geometry.height),
            "Layer 1",
        );
        self.current = self.doc.get_page(page).get_layer(layer);
        self.layers.push(self.current.clone());
        self.cursor.reset();
    }

    fn ensure_space(&mut self, height: f32) {
        if !self.cursor.fits(height) {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        if self.cursor.fits(height) {
            self.cursor.advance(height);
        }
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = line_height_mm(size);
        self.ensure_space(height);
        let baseline = self.cursor.y() - size * MM_PER_PT;
        let font = if bold { &self.bold } else { &self.font };
        self.current.use_text(
            text,
            size,
            Mm(self.geometry.margin_left),
            Mm(baseline),
            font,
        );
        self.cursor.advance(height);
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap_text(text, self.geometry.content_width(), size) {
            self.line(&line, size, false);
        }
    }

    fn photos(&mut self, thumbs: &[&Thumbnail]) {
        let max_w = self.geometry.content_width();
        let max_h = self.geometry.content_height() / 2.0;
        let placed: Vec<(f32, f32, f32)> = thumbs
            .iter()
            .map(|t| photo_display_size(t.width, t.height, max_w, max_h))
            .collect();
        let sizes: Vec<(f32, f32)> = placed.iter().map(|&(w, h, _)| (w, h)).collect();

        for row in pack_rows(&sizes, max_w, PHOTO_GAP) {
            self.ensure_space(row.height);
            let top = self.cursor.y();
            for (index, x) in row.items {
                let (_, h, dpi) = placed[index];
                let image = Image::from_dynamic_image(&thumbs[index].image);
                image.add_to_layer(
                    self.current.clone(),
                    ImageTransform {
                        translate_x: Some(Mm(self.geometry.margin_left + x)),
                        translate_y: Some(Mm(top - h)),
                        dpi: Some(dpi),
                        ..Default::default()
                    },
                );
                self.photos_embedded += 1;
            }
            self.cursor.advance(row.height + PHOTO_GAP);
        }
    }

    fn finish(self) -> ReportResult<RenderedPdf> {
        let total = self.layers.len();
        for (i, layer) in self.layers.iter().enumerate() {
            let label = page_label(i + 1, total);
            let x = self.geometry.width
                - self.geometry.margin_right
                - text_width_mm(&label, FOOTER_SIZE);
            layer.use_text(
                label,
                FOOTER_SIZE,
                Mm(x),
                Mm(self.geometry.margin_bottom / 2.0),
                &self.font,
            );
        }

        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportError::Render(format!("pdf save: {e}")))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| ReportError::Render(format!("pdf buffer: {e}")))?;
        Ok(RenderedPdf {
            bytes,
            page_count: total,
            photos_embedded: self.photos_embedded,
            photo_fallbacks: self.photo_fallbacks,
        })
    }
}

fn render(
    calendar: &LocalCalendar,
    assembled: &Assembled,
    notes_by_day: &HashMap<DayId, Vec<NoteBlock>>,
) -> ReportResult<RenderedPdf> {
    let mut w = PdfWriter::new("Health diary export")?;

    w.line("Health diary export", TITLE_SIZE, true);
    w.gap(2.0);
    w.line(&format!("Created {}", to_date_key(calendar.today())), BODY_SIZE, false);
    match (assembled.days.first(), assembled.days.last()) {
        (Some(first), Some(last)) => {
            w.line(
                &format!("Range: {} to {}", to_date_key(first.date), to_date_key(last.date)),
                BODY_SIZE,
                false,
            );
            w.line(&format!("Days: {}", assembled.days.len()), BODY_SIZE, false);
        }
        _ => w.line("No recorded days in this range.", BODY_SIZE, false),
    }
    w.line(
        &format!("Active habits: {}", assembled.active_habit_count),
        BODY_SIZE,
        false,
    );
    w.gap(8.0);

    for day in &assembled.days {
        let key = to_date_key(day.date);
        w.gap(4.0);
        // heading and first metric line stay together
        w.ensure_space(line_height_mm(HEADING_SIZE) + line_height_mm(BODY_SIZE));
        w.line(
            &format!(
                "{} {} - {} - {}",
                day.date.format("%a"),
                key,
                day.phase.as_str(),
                day.care.as_str()
            ),
            HEADING_SIZE,
            true,
        );

        let done = assembled.ticks_done_count(day.id);
        w.line(
            &format!(
                "Well-being: {}   Stool: {}   Habits: {} / {} ({})",
                fmt_opt(assembled.well_being_for(&key)),
                fmt_opt(assembled.stool_by_day_id.get(&day.id)),
                done,
                assembled.active_habit_count,
                fmt_opt(assembled.habit_ratio_for(&key)),
            ),
            BODY_SIZE,
            false,
        );

        let symptoms: Vec<String> = SymptomType::ALL
            .into_iter()
            .filter_map(|s| assembled.symptom(s, &key).map(|v| format!("{}: {v}", s.label())))
            .collect();
        if !symptoms.is_empty() {
            w.paragraph(&format!("Symptoms: {}", symptoms.join(", ")), BODY_SIZE);
        }
        let custom: Vec<String> = assembled
            .custom_defs
            .iter()
            .filter_map(|c| {
                assembled
                    .custom_score(c.id, &key)
                    .map(|v| format!("{}: {v}", c.title))
            })
            .collect();
        if !custom.is_empty() {
            w.paragraph(&format!("Custom symptoms: {}", custom.join(", ")), BODY_SIZE);
        }

        if let Some(note) = day.note.as_deref().filter(|n| !n.trim().is_empty()) {
            w.gap(1.5);
            w.paragraph(note, BODY_SIZE);
        }

        for block in notes_by_day.get(&day.id).map(Vec::as_slice).unwrap_or(&[]) {
            w.gap(2.0);
            w.line(&block.time, SMALL_SIZE, true);
            if let Some(text) = &block.text {
                w.paragraph(text, BODY_SIZE);
            }
            let embedded: Vec<&Thumbnail> = block
                .photos
                .iter()
                .filter_map(|p| match p {
                    PhotoSlot::Embedded(t) => Some(t),
                    PhotoSlot::Fallback(_) => None,
                })
                .collect();
            if !embedded.is_empty() {
                w.gap(1.0);
                w.photos(&embedded);
            }
            for slot in &block.photos {
                if let PhotoSlot::Fallback(url) = slot {
                    w.paragraph(&format!("Photo: {url}"), SMALL_SIZE);
                    w.photo_fallbacks += 1;
                }
            }
            if block.skipped_photos > 0 {
                w.line(
                    &format!("Photos: {} (not embedded)", block.skipped_photos),
                    SMALL_SIZE,
                    false,
                );
            }
        }
    }

    w.finish()
}
