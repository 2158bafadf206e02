// src/render/text.rs
//! Отрисовка надписей
//!
//! Шрифт загружается один раз: из пути в конфигурации или, если путь не
//! задан, из первого найденного системного жирного шрифта. Если не нашлось
//! ни одного, надписи пропускаются с предупреждением в логе, а карта
//! всё равно рисуется.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use imageproc::drawing::draw_text_mut;
use rusttype::{Font, Scale, point};

use crate::config::FontSettings;
use crate::error::{MapError, Result};
use crate::scene::{HAlign, TextItem, VAlign};

/// Системные жирные шрифты, которые пробуются по порядку
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Рисует текст одним шрифтом
pub struct TextPainter {
    font: Option<Font<'static>>,
    synthetic_bold: bool,
}

impl TextPainter {
    /// Загружает шрифт по настройкам.
    ///
    /// Явно заданный, но не читаемый шрифт — ошибка; отсутствие системного — нет.
    pub fn load(settings: &FontSettings) -> Result<Self> {
        let font = match &settings.path {
            Some(path) => Some(read_font(path)?),
            None => discover_font(),
        };
        Ok(Self {
            font,
            synthetic_bold: settings.synthetic_bold,
        })
    }

    /// Рисовальщик без шрифта: все надписи пропускаются
    #[must_use]
    pub fn without_font() -> Self {
        Self {
            font: None,
            synthetic_bold: false,
        }
    }

    #[must_use]
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Ширина и высота многострочного блока в пикселях
    #[cfg(test)]
    fn measure(&self, text: &str, size_px: f32) -> (f32, f32) {
        let Some(font) = &self.font else {
            return (0.0, 0.0);
        };
        let scale = Scale::uniform(size_px);
        let width = text
            .lines()
            .map(|line| line_width(font, scale, line))
            .fold(0.0, f32::max);
        let height = line_height(font, scale) * text.lines().count() as f32;
        (width, height)
    }

    /// Рисует надпись с выравниванием относительно точки `(x, y)` в пикселях.
    /// Строки выравниваются по горизонтали так же, как весь блок.
    pub fn draw(&self, img: &mut RgbaImage, item: &TextItem, (x, y): (f32, f32), size_px: f32) {
        let Some(font) = &self.font else {
            return;
        };
        let text = item.text.as_str();
        let color = item.color.to_pixel();
        let scale = Scale::uniform(size_px);
        let line_h = line_height(font, scale);
        let block_h = line_h * text.lines().count() as f32;
        let top = match item.v_align {
            VAlign::Top => y,
            VAlign::Center => y - block_h / 2.0,
            VAlign::Bottom => y - block_h,
        };
        let stroke = (size_px / 30.0).round().max(1.0) as i32;

        for (i, line) in text.lines().enumerate() {
            let w = line_width(font, scale, line);
            let left = match item.h_align {
                HAlign::Left => x,
                HAlign::Center => x - w / 2.0,
                HAlign::Right => x - w,
            };
            let (lx, ly) = (left.round() as i32, (top + i as f32 * line_h).round() as i32);
            draw_text_mut(img, color, lx, ly, scale, font, line);
            if item.bold && self.synthetic_bold {
                draw_text_mut(img, color, lx + stroke, ly, scale, font, line);
            }
        }
    }
}

fn line_height(font: &Font<'_>, scale: Scale) -> f32 {
    let v = font.v_metrics(scale);
    v.ascent - v.descent + v.line_gap
}

fn line_width(font: &Font<'_>, scale: Scale, line: &str) -> f32 {
    font.layout(line, scale, point(0.0, 0.0))
        .last()
        .map_or(0.0, |g| {
            g.position().x + g.unpositioned().h_metrics().advance_width
        })
}

fn read_font(path: &Path) -> Result<Font<'static>> {
    let bytes = fs::read(path)?;
    let font = Font::try_from_vec(bytes).ok_or_else(|| MapError::Font(path.to_path_buf()))?;
    tracing::info!(path = %path.display(), "шрифт загружен");
    Ok(font)
}

fn discover_font() -> Option<Font<'static>> {
    let found = FONT_CANDIDATES
        .iter()
        .map(|p| PathBuf::from(*p))
        .filter(|p| p.is_file())
        .find_map(|p| read_font(&p).ok());
    if found.is_none() {
        tracing::warn!("системный шрифт не найден, надписи не будут нарисованы");
    }
    found
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::colormap::RgbaColor;
    use crate::scene::Anchor;

    #[test]
    fn painter_without_font_draws_nothing() {
        let painter = TextPainter::without_font();
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let item = TextItem {
            text: "Koshi\nHDI: 0.580".to_string(),
            anchor: Anchor::Figure { x: 0.5, y: 0.5 },
            size_pt: 12.0,
            color: RgbaColor::BLACK,
            bold: true,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
        };
        painter.draw(&mut img, &item, (10.0, 10.0), 12.0);
        assert!(img.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
        assert_eq!(painter.measure("Koshi", 12.0), (0.0, 0.0));
    }

    #[test]
    fn configured_font_must_exist() {
        let settings = FontSettings {
            path: Some(PathBuf::from("/nonexistent/font.ttf")),
            synthetic_bold: false,
        };
        assert!(TextPainter::load(&settings).is_err());
    }

    #[test]
    fn garbage_font_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"not a font").unwrap();
        let err = read_font(&path).err().unwrap();
        assert!(matches!(err, MapError::Font(_)));
    }

    #[test]
    fn discovered_font_measures_multiline_blocks() {
        let painter = TextPainter::load(&FontSettings::default()).unwrap();
        if !painter.has_font() {
            return;
        }
        let (w1, h1) = painter.measure("Koshi", 40.0);
        let (w2, h2) = painter.measure("Koshi\nHDI: 0.580", 40.0);
        assert!(w1 > 0.0 && w2 > w1);
        assert!((h2 - 2.0 * h1).abs() < 1e-3);
    }
}
