// src/render/canvas.rs
//! Примитивы растеризации
//!
//! - Перевод координат данных и долей фигуры в пиксели ([`PixelTransform`])
//! - Заливка мультиполигонов по строкам развёртки с правилом чёт-нечет
//!   (дыры в полигонах остаются пустыми) и альфа-смешиванием
//! - Обводка контуров толщиной в несколько пикселей
//! - Градиентная полоса легенды
//!
//! Пересечения строк развёртки считаются независимо для каждой строки, поэтому
//! с фичей `parallel` они распределяются по потокам `rayon`.

use geo::MultiPolygon;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::scene::{Legend, MapFrame};

/// Кольцо полигона в пикселях
pub type PixelRing = Vec<(f32, f32)>;

/// Перевод координат сцены в пиксели изображения (ось Y направлена вниз)
#[derive(Debug, Clone, Copy)]
pub struct PixelTransform {
    pub frame: MapFrame,
    pub width: u32,
    pub height: u32,
}

impl PixelTransform {
    #[must_use]
    pub fn new(frame: MapFrame, width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    /// Координаты данных → пиксели
    #[must_use]
    pub fn data(&self, x: f64, y: f64) -> (f32, f32) {
        self.figure(self.frame.data_to_figure(x, y))
    }

    /// Доли фигуры (начало внизу слева) → пиксели
    #[must_use]
    pub fn figure(&self, at: [f32; 2]) -> (f32, f32) {
        (
            at[0] * self.width as f32,
            (1.0 - at[1]) * self.height as f32,
        )
    }

    /// Прямоугольник в долях фигуры `[left, bottom, width, height]` →
    /// `(x0, y0, x1, y1)` в пикселях, `y0` сверху
    #[must_use]
    pub fn figure_rect(&self, rect: [f32; 4]) -> (f32, f32, f32, f32) {
        let [left, bottom, w, h] = rect;
        let (x0, y0) = self.figure([left, bottom + h]);
        let (x1, y1) = self.figure([left + w, bottom]);
        (x0, y0, x1, y1)
    }
}

/// Все кольца мультиполигона (внешние и дыры) в пикселях
#[must_use]
pub fn project_rings(geometry: &MultiPolygon<f64>, transform: &PixelTransform) -> Vec<PixelRing> {
    geometry
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| ring.coords().map(|c| transform.data(c.x, c.y)).collect())
        .collect()
}

/// Отрезки `[start, end)` строки `y`, попадающие внутрь колец (чёт-нечет).
/// Пиксель закрашивается, если внутри лежит его центр.
fn scanline_spans(rings: &[PixelRing], y: u32, width: u32) -> Vec<(u32, u32)> {
    let cy = y as f32 + 0.5;
    let mut crossings: Vec<f32> = Vec::new();
    for ring in rings {
        for edge in ring.windows(2) {
            let (x0, y0) = edge[0];
            let (x1, y1) = edge[1];
            if (y0 <= cy) != (y1 <= cy) {
                crossings.push(x0 + (cy - y0) * (x1 - x0) / (y1 - y0));
            }
        }
    }
    crossings.sort_by(f32::total_cmp);

    crossings
        .chunks_exact(2)
        .filter_map(|pair| {
            let start = (pair[0] - 0.5).ceil().clamp(0.0, width as f32) as u32;
            let end = (pair[1] - 0.5).ceil().clamp(0.0, width as f32) as u32;
            (start < end).then_some((start, end))
        })
        .collect()
}

/// Заливает кольца цветом с альфа-смешиванием поверх текущих пикселей
pub fn fill_rings(img: &mut RgbaImage, rings: &[PixelRing], color: Rgba<u8>) {
    let (width, height) = img.dimensions();
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    if !min_y.is_finite() || max_y < 0.0 || min_y >= height as f32 {
        return;
    }
    let first = min_y.max(0.0).floor() as u32;
    let last = (max_y.ceil() as u32).min(height);

    #[cfg(feature = "parallel")]
    let rows: Vec<(u32, Vec<(u32, u32)>)> = (first..last)
        .into_par_iter()
        .map(|y| (y, scanline_spans(rings, y, width)))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<(u32, Vec<(u32, u32)>)> = (first..last)
        .map(|y| (y, scanline_spans(rings, y, width)))
        .collect();

    for (y, spans) in rows {
        for (start, end) in spans {
            for x in start..end {
                blend_over(img.get_pixel_mut(x, y), color);
            }
        }
    }
}

/// Накладывает `src` поверх `dst` (оператор «over»).
/// Непрозрачный фон остаётся непрозрачным.
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let src_a = f32::from(src[3]) / 255.0;
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let mixed = (f32::from(src[c]) * src_a + f32::from(dst[c]) * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Обводит кольца линией толщиной `width_px`
pub fn stroke_rings(img: &mut RgbaImage, rings: &[PixelRing], color: Rgba<u8>, width_px: f32) {
    let radius = ((width_px - 1.0) / 2.0).round().max(0.0) as i32;
    for ring in rings {
        for edge in ring.windows(2) {
            let (x0, y0) = edge[0];
            let (x1, y1) = edge[1];
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    let (dx, dy) = (ox as f32, oy as f32);
                    draw_line_segment_mut(img, (x0 + dx, y0 + dy), (x1 + dx, y1 + dy), color);
                }
            }
        }
    }
}

/// Рисует полосу легенды: градиент слева направо и рамку.
/// Возвращает прямоугольник полосы в пикселях.
pub fn draw_legend_bar(
    img: &mut RgbaImage,
    legend: &Legend,
    transform: &PixelTransform,
    border: Rgba<u8>,
) -> (f32, f32, f32, f32) {
    let (x0, y0, x1, y1) = transform.figure_rect(legend.rect);
    let (width, height) = img.dimensions();
    let left = x0.round().max(0.0) as u32;
    let right = (x1.round() as u32).min(width);
    let top = y0.round().max(0.0) as u32;
    let bottom = (y1.round() as u32).min(height);
    let span = (x1 - x0).max(1.0);

    for x in left..right {
        let t = f64::from((x as f32 + 0.5 - x0) / span);
        let color = legend.color_at(t).to_pixel();
        for y in top..bottom {
            img.put_pixel(x, y, color);
        }
    }

    if right > left && bottom > top {
        let rect = Rect::at(left as i32, top as i32).of_size(right - left, bottom - top);
        draw_hollow_rect_mut(img, rect, border);
    }
    (x0, y0, x1, y1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, size: f32) -> PixelRing {
        vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ]
    }

    #[test]
    fn fills_only_pixels_with_center_inside() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        fill_rings(&mut img, &[square(2.0, 2.0, 4.0)], Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(5, 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(6, 6), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(1, 3), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn holes_stay_empty() {
        let mut img = RgbaImage::from_pixel(12, 12, Rgba([255, 255, 255, 255]));
        let rings = vec![square(1.0, 1.0, 10.0), square(4.0, 4.0, 4.0)];
        fill_rings(&mut img, &rings, Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        fill_rings(&mut img, &[square(0.0, 0.0, 4.0)], Rgba([0, 0, 0, 128]));
        let p = img.get_pixel(1, 1);
        assert!(p[0] > 100 && p[0] < 155, "got {p:?}");
        assert_eq!(p[3], 255);
    }

    #[test]
    fn blending_over_transparent_keeps_source() {
        let mut p = Rgba([0, 0, 0, 0]);
        blend_over(&mut p, Rgba([200, 100, 50, 128]));
        assert_eq!(p, Rgba([200, 100, 50, 128]));

        let mut p = Rgba([255, 255, 255, 255]);
        blend_over(&mut p, Rgba([128, 0, 128, 191]));
        assert_eq!(p[3], 255);
    }

    #[test]
    fn shapes_outside_the_image_are_ignored() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        fill_rings(&mut img, &[square(-20.0, -20.0, 5.0)], Rgba([0, 0, 0, 255]));
        fill_rings(&mut img, &[], Rgba([0, 0, 0, 255]));
        assert!(img.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn figure_origin_is_bottom_left() {
        let frame = MapFrame {
            bounds: [0.0, 0.0, 1.0, 1.0],
            axes: [0.0, 0.0, 1.0, 1.0],
        };
        let t = PixelTransform::new(frame, 200, 100);
        assert_eq!(t.figure([0.0, 0.0]), (0.0, 100.0));
        assert_eq!(t.figure([1.0, 1.0]), (200.0, 0.0));
        assert_eq!(t.data(0.5, 0.5), (100.0, 50.0));
        assert_eq!(t.figure_rect([0.5, 0.5, 0.5, 0.5]), (100.0, 0.0, 200.0, 50.0));
    }
}
