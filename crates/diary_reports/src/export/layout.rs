//! Page geometry, text measurement and image packing for the PDF export.
//!
//! Everything here works in millimetres and is independent of the PDF
//! backend, so pagination decisions can be tested without rendering.

use unicode_normalization::UnicodeNormalization;

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Pixel density a photo is laid out at before any downscaling.
pub const BASE_DPI: f32 = 96.0;

/// Advance widths of Helvetica in 1/1000 em for the WinAnsi repertoire.
/// Accented Latin letters share the width of their base letter.
fn glyph_width(c: char) -> u16 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' => 278,
        'f' | 't' | 'I' => 278,
        '"' => 355,
        '#' | '$' | '0'..='9' | '?' | '_' => 556,
        '%' => 889,
        '&' => 667,
        '\'' | 'i' | 'j' | 'l' => 222,
        '(' | ')' | '-' | '`' | 'r' => 333,
        '*' => 389,
        '+' | '<' | '=' | '>' | '~' => 584,
        '@' => 1015,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722,
        'F' | 'T' | 'Z' => 611,
        'G' | 'O' | 'Q' => 778,
        'J' => 500,
        'L' => 556,
        'M' | 'm' => 833,
        'W' => 944,
        '^' => 469,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        'w' => 722,
        '{' | '}' => 334,
        '|' => 260,
        'ß' => 611,
        'Æ' | 'Œ' | '—' | '…' | '‰' => 1000,
        'æ' => 889,
        'œ' => 944,
        'Ø' => 778,
        'ø' => 611,
        '°' => 400,
        '×' => 584,
        '•' => 350,
        '·' => 278,
        '‘' | '’' | '‚' => 222,
        '“' | '”' | '„' => 333,
        c if !c.is_ascii() => base_letter(c).map_or(556, glyph_width),
        _ => 556,
    }
}

/// ASCII base of a precomposed letter, e.g. `Ü` to `U`.
fn base_letter(c: char) -> Option<char> {
    let base = std::iter::once(c).nfd().next()?;
    (base != c && base.is_ascii()).then_some(base)
}

pub fn text_width_mm(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c))).sum();
    units as f32 / 1000.0 * font_size * MM_PER_PT
}

/// Height of one line of text at `font_size`, with leading.
pub fn line_height_mm(font_size: f32) -> f32 {
    font_size * 1.35 * MM_PER_PT
}

/// Greedy word wrap to `max_width` millimetres.
///
/// Explicit newlines start a new line. A word wider than the column is split
/// at the last character that still fits.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let fits = |s: &str| text_width_mm(s, font_size) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            for c in word.chars() {
                current.push(c);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width: 210.0,
        height: 297.0,
        margin_top: 18.0,
        margin_bottom: 20.0,
        margin_left: 18.0,
        margin_right: 18.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }

    pub fn top(&self) -> f32 {
        self.height - self.margin_top
    }
}

/// Vertical position on the current page, measured from the page bottom.
#[derive(Clone, Copy, Debug)]
pub struct Cursor {
    geometry: PageGeometry,
    y: f32,
}

impl Cursor {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            y: geometry.top(),
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Whether a block of `height` fits above the bottom margin.
    pub fn fits(&self, height: f32) -> bool {
        self.y - height >= self.geometry.margin_bottom
    }

    pub fn advance(&mut self, height: f32) {
        self.y -= height;
    }

    pub fn reset(&mut self) {
        self.y = self.geometry.top();
    }
}

/// Display size in mm and the dpi to place a `px_w` x `px_h` image at so it
/// stays within `max_w` x `max_h` without changing its aspect ratio.
pub fn photo_display_size(px_w: u32, px_h: u32, max_w: f32, max_h: f32) -> (f32, f32, f32) {
    let w = px_w as f32 * 25.4 / BASE_DPI;
    let h = px_h as f32 * 25.4 / BASE_DPI;
    let scale = (max_w / w).min(max_h / h).min(1.0);
    (w * scale, h * scale, BASE_DPI / scale)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageRow {
    /// `(index into the input, x offset from the left content edge)`
    pub items: Vec<(usize, f32)>,
    /// Tallest image in the row.
    pub height: f32,
}

/// Pack images left to right, starting a new row when the next one would
/// overflow `content_width`.
pub fn pack_rows(sizes: &[(f32, f32)], content_width: f32, gap: f32) -> Vec<ImageRow> {
    let mut rows = Vec::new();
    let mut row = ImageRow {
        items: Vec::new(),
        height: 0.0,
    };
    let mut x = 0.0;

    for (index, &(w, h)) in sizes.iter().enumerate() {
        if !row.items.is_empty() && x + w > content_width {
            rows.push(std::mem::replace(
                &mut row,
                ImageRow {
                    items: Vec::new(),
                    height: 0.0,
                },
            ));
            x = 0.0;
        }
        row.items.push((index, x));
        row.height = row.height.max(h);
        x += w + gap;
    }
    if !row.items.is_empty() {
        rows.push(row);
    }
    rows
}

pub fn page_label(page: usize, total: usize) -> String {
    format!("page {page} / {total}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_helvetica_widths() {
        // "Hi" = 722 + 222 units
        let w = text_width_mm("Hi", 10.0);
        assert!((w - 0.944 * 10.0 * MM_PER_PT).abs() < 1e-4);
        assert!(text_width_mm("WWW", 10.0) > text_width_mm("iii", 10.0));
        assert_eq!(text_width_mm("", 12.0), 0.0);
    }

    #[test]
    fn accented_letters_measure_like_their_base() {
        assert_eq!(text_width_mm("Übelkeit", 10.0), text_width_mm("Ubelkeit", 10.0));
        assert_eq!(text_width_mm("Ödeme", 10.0), text_width_mm("Odeme", 10.0));
        assert_eq!(text_width_mm("é", 10.0), text_width_mm("e", 10.0));
        // U = 722, O = 778, default = 556
        assert!(text_width_mm("Ü", 10.0) > text_width_mm("ä", 10.0));
        assert!((text_width_mm("ß", 10.0) - 0.611 * 10.0 * MM_PER_PT).abs() < 1e-4);
    }

    #[test]
    fn wraps_greedily_by_width() {
        let width = text_width_mm("gamma delta", 10.0) + 0.1;
        let lines = wrap_text("alpha beta gamma delta", width, 10.0);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        for line in &lines {
            assert!(text_width_mm(line, 10.0) <= width);
        }
    }

    #[test]
    fn hard_splits_overlong_words() {
        let width = text_width_mm("abcd", 10.0) + 0.01;
        let lines = wrap_text("abcdefghij", width, 10.0);
        assert_eq!(lines.concat(), "abcdefghij");
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 10.0) <= width);
        }
    }

    #[test]
    fn keeps_explicit_line_breaks() {
        let lines = wrap_text("first\n\nthird", 100.0, 10.0);
        assert_eq!(lines, vec!["first", "", "third"]);
        assert!(wrap_text("", 100.0, 10.0).is_empty());
    }

    #[test]
    fn cursor_breaks_above_bottom_margin() {
        let geometry = PageGeometry::A4;
        let mut cursor = Cursor::new(geometry);
        assert!(cursor.fits(geometry.content_height()));
        assert!(!cursor.fits(geometry.content_height() + 0.5));
        cursor.advance(200.0);
        assert!(!cursor.fits(80.0));
        cursor.reset();
        assert_eq!(cursor.y(), geometry.top());
    }

    #[test]
    fn packs_rows_and_tracks_tallest_image() {
        let rows = pack_rows(&[(50.0, 30.0), (60.0, 45.0), (70.0, 20.0)], 150.0, 4.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].items, vec![(0, 0.0), (1, 54.0)]);
        assert_eq!(rows[0].height, 45.0);
        assert_eq!(rows[1].items, vec![(2, 0.0)]);
        assert_eq!(rows[1].height, 20.0);
        assert!(pack_rows(&[], 150.0, 4.0).is_empty());
    }

    #[test]
    fn photo_size_preserves_aspect_and_only_shrinks() {
        let (w, h, dpi) = photo_display_size(96, 48, 170.0, 250.0);
        assert!((w - 25.4).abs() < 1e-3);
        assert!((h - 12.7).abs() < 1e-3);
        assert_eq!(dpi, BASE_DPI);

        let (w, h, dpi) = photo_display_size(1000, 500, 100.0, 250.0);
        assert!((w - 100.0).abs() < 1e-3);
        assert!((w / h - 2.0).abs() < 1e-3);
        assert!(dpi > BASE_DPI);
    }

    #[test]
    fn labels_pages() {
        assert_eq!(page_label(2, 5), "page 2 / 5");
    }
}
