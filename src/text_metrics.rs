use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

const SYSTEM_KEY: &str = "sans-serif";

/// Width of `text` in pixels. Uses `font_file` when given, otherwise the
/// system sans-serif face. `None` when no usable font was found.
pub fn measure_text_width(text: &str, font_size: f32, font_file: Option<&Path>) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_file)
}

/// Rough width used when no font can be loaded.
pub fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.56
}

/// Measured width with the character-count estimate as fallback.
pub fn text_width(text: &str, font_size: f32, font_file: Option<&Path>) -> f32 {
    measure_text_width(text, font_size, font_file)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_file: Option<&Path>) -> Option<f32> {
        let key = font_file
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| SYSTEM_KEY.to_string());
        if !self.cache.contains_key(&key) {
            let face = match font_file {
                Some(path) => load_file_face(path),
                None => self.load_system_face(),
            };
            if face.is_none() {
                log::debug!("no usable font for `{key}`, estimating text widths");
            }
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get(&key)?.as_ref()?;
        Some(face.measure_width(&text.replace('\t', "    "), font_size))
    }

    fn load_system_face(&mut self) -> Option<FontFace> {
        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }
        let query = Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }
}

fn load_file_face(path: &Path) -> Option<FontFace> {
    let bytes = std::fs::read(path).ok()?;
    FontFace::new(bytes, 0)
}

/// Font bytes plus precomputed ASCII advances. Non-ASCII text re-parses the
/// face on demand.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return width.max(0.0);
        }

        let Ok(face) = Face::parse(&self.data, self.index) else {
            return fallback_text_width(text, font_size);
        };
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph));
            match advance {
                Some(advance) => width += advance as f32 * scale,
                None => width += fallback,
            }
        }
        width.max(0.0)
    }
}
