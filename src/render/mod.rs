// src/render/mod.rs
//! Рендеринг хороплета
//!
//! [`ChoroplethRenderer`] связывает все этапы:
//! 1. чтение таблицы показателя и границ провинций
//! 2. сборка сцены ([`crate::scene::build_scene`])
//! 3. растеризация сцены ([`rasterize`])
//! 4. запись PNG ([`png::save_png`]) и, по желанию, показ ([`png::show_png`])
//!
//! Порядок слоёв при растеризации: фон, фоновый водяной знак, заливки,
//! границы, подписи провинций, легенда, среднее по стране, водяной знак.

pub mod canvas;
pub mod png;
pub mod text;

use image::RgbaImage;
use imageproc::drawing::draw_line_segment_mut;

use crate::config::RenderSettings;
use crate::error::Result;
use crate::metric::MetricTable;
use crate::province::ProvinceShape;
use crate::province::loader::load_provinces;
use crate::scene::{Anchor, HAlign, Scene, TextItem, VAlign, build_scene};
use canvas::{PixelTransform, draw_legend_bar, fill_rings, project_rings, stroke_rings};
use text::TextPainter;

/// Рендерер карты показателя по провинциям
pub struct ChoroplethRenderer {
    settings: RenderSettings,
    painter: TextPainter,
}

impl ChoroplethRenderer {
    /// Создаёт рендерер и загружает шрифт
    pub fn new(settings: RenderSettings) -> Result<Self> {
        let painter = TextPainter::load(&settings.font)?;
        Ok(Self::with_painter(settings, painter))
    }

    #[must_use]
    pub fn with_painter(settings: RenderSettings, painter: TextPainter) -> Self {
        Self { settings, painter }
    }

    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Читает таблицу показателя и границы провинций из путей настроек
    pub fn load_inputs(&self) -> Result<(MetricTable, Vec<ProvinceShape>)> {
        let metrics = MetricTable::from_csv_path(&self.settings.data_path, &self.settings.columns)?;
        tracing::info!(
            path = %self.settings.data_path.display(),
            rows = metrics.len(),
            "таблица показателя загружена"
        );
        let provinces = load_provinces(
            &self.settings.geometry_path,
            &self.settings.columns.geometry_id,
        )?;
        Ok((metrics, provinces))
    }

    /// Читает входные данные и собирает сцену
    pub fn scene(&self) -> Result<Scene> {
        let (metrics, provinces) = self.load_inputs()?;
        build_scene(&provinces, &metrics, &self.settings)
    }

    /// Растеризует сцену шрифтом этого рендерера
    #[must_use]
    pub fn rasterize(&self, scene: &Scene) -> RgbaImage {
        rasterize(scene, &self.painter)
    }

    /// Полный проход: данные → сцена → изображение → PNG по `output_path`.
    /// При `figure.show` файл затем открывается в просмотрщике.
    /// Возвращает нарисованную сцену.
    pub fn render(&self) -> Result<Scene> {
        let scene = self.scene()?;
        tracing::info!(
            width = scene.width_px,
            height = scene.height_px,
            provinces = scene.fills.len(),
            average = scene.average.value,
            "растеризация"
        );
        let img = self.rasterize(&scene);
        png::save_png(&img, &self.settings.output_path)?;
        if self.settings.figure.show {
            png::show_png(&self.settings.output_path);
        }
        Ok(scene)
    }
}

/// Рисует сцену в новое изображение
#[must_use]
pub fn rasterize(scene: &Scene, painter: &TextPainter) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(scene.width_px, scene.height_px, scene.background.to_pixel());
    let transform = PixelTransform::new(scene.frame, scene.width_px, scene.height_px);
    let pt = |size: f32| size * scene.dpi / 72.0;

    let draw_text = |img: &mut RgbaImage, item: &TextItem| {
        let at = match item.anchor {
            Anchor::Data { x, y } => transform.data(x, y),
            Anchor::Figure { x, y } => transform.figure([x, y]),
        };
        painter.draw(img, item, at, pt(item.size_pt));
    };

    if let Some(backdrop) = &scene.backdrop {
        draw_text(&mut img, backdrop);
    }

    let outlines: Vec<_> = scene
        .fills
        .iter()
        .map(|fill| {
            let rings = project_rings(&fill.geometry, &transform);
            fill_rings(&mut img, &rings, fill.color.to_pixel());
            rings
        })
        .collect();
    let edge = scene.edge.color.to_pixel();
    for rings in &outlines {
        stroke_rings(&mut img, rings, edge, pt(scene.edge.width_pt));
    }

    for label in &scene.labels {
        draw_text(&mut img, &label.text_item());
    }

    let legend = &scene.legend;
    let text_color = legend.caption.color;
    let (x0, y0, x1, _) = draw_legend_bar(&mut img, legend, &transform, text_color.to_pixel());
    let tick_len = pt(3.5);
    let span = legend.vmax - legend.vmin;
    for tick in &legend.ticks {
        let t = if span > 0.0 {
            ((tick.value - legend.vmin) / span) as f32
        } else {
            0.0
        };
        let x = x0 + t * (x1 - x0);
        draw_line_segment_mut(&mut img, (x, y0), (x, y0 - tick_len), text_color.to_pixel());
        let item = TextItem {
            text: tick.label.clone(),
            anchor: Anchor::Figure {
                x: x / scene.width_px as f32,
                y: 1.0 - (y0 - 2.0 * tick_len) / scene.height_px as f32,
            },
            size_pt: legend.tick_size,
            color: text_color,
            bold: false,
            h_align: HAlign::Center,
            v_align: VAlign::Bottom,
        };
        draw_text(&mut img, &item);
    }
    draw_text(&mut img, &legend.caption);
    for line in &legend.title {
        draw_text(&mut img, line);
    }

    draw_text(&mut img, &scene.average.caption);
    draw_text(&mut img, &scene.average.figure);
    draw_text(&mut img, &scene.watermark);

    img
}
