// src/scene.rs
//! Описание сцены
//!
//! Сцена — это всё, что будет нарисовано, в виде данных: заливки провинций,
//! подписи, легенда, среднее по стране и водяной знак. Сборка сцены
//! ([`build_scene`]) — чистая функция без ввода-вывода; растеризация живёт в
//! [`crate::render`]. Сцену можно сохранить в JSON для отладки.
//!
//! ## Системы координат
//! - **данные** — координаты геометрии (для Непала — градусы WGS84)
//! - **фигура** — доли от всей фигуры, `(0, 0)` в левом нижнем углу
//! - **оси карты** — доли от прямоугольника карты; переводятся в фигуру
//!   при сборке сцены через [`MapFrame::axes_to_figure`]

use geo::MultiPolygon;
use serde::Serialize;

use crate::colormap::{Colormap, Normalize, RgbaColor, ScalarMapper};
use crate::config::{FigureSettings, RenderSettings};
use crate::error::{MapError, Result};
use crate::metric::MetricTable;
use crate::province::label::{LabelOffsets, LabelStyle, ProvinceLabel, place_label};
use crate::province::{self, ProvinceShape};

/// Горизонтальное выравнивание текста относительно точки привязки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Вертикальное выравнивание текста относительно точки привязки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

/// Точка привязки текста
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Anchor {
    /// Координаты данных
    Data { x: f64, y: f64 },
    /// Доли фигуры, начало в левом нижнем углу
    Figure { x: f32, y: f32 },
}

/// Одна надпись (может быть многострочной)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextItem {
    pub text: String,
    pub anchor: Anchor,
    /// Кегль в пунктах
    pub size_pt: f32,
    pub color: RgbaColor,
    pub bold: bool,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

impl TextItem {
    fn figure(text: impl Into<String>, at: [f32; 2], size_pt: f32, color: RgbaColor) -> Self {
        Self {
            text: text.into(),
            anchor: Anchor::Figure { x: at[0], y: at[1] },
            size_pt,
            color,
            bold: true,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
        }
    }

    fn aligned(mut self, h_align: HAlign, v_align: VAlign) -> Self {
        self.h_align = h_align;
        self.v_align = v_align;
        self
    }
}

impl ProvinceLabel {
    /// Подпись как надпись, центрированная на точке привязки
    #[must_use]
    pub fn text_item(&self) -> TextItem {
        TextItem {
            text: self.text.clone(),
            anchor: Anchor::Data {
                x: self.position[0],
                y: self.position[1],
            },
            size_pt: self.font_size,
            color: self.color,
            bold: true,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
        }
    }
}

/// Размещение карты внутри фигуры
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapFrame {
    /// Видимая область данных `[min_x, min_y, max_x, max_y]` (с полями)
    pub bounds: [f64; 4],
    /// Прямоугольник карты в долях фигуры `[left, bottom, width, height]`
    /// после подгонки под соотношение сторон
    pub axes: [f32; 4],
}

impl MapFrame {
    /// Вписывает границы данных в прямоугольник осей с сохранением пропорций.
    ///
    /// `aspect` — во сколько раз единица по Y длиннее единицы по X на экране.
    #[must_use]
    pub fn fit(data: [f64; 4], figure: &FigureSettings, aspect: f64) -> Self {
        let [mut min_x, mut min_y, mut max_x, mut max_y] = data;
        let pad = |lo: f64, hi: f64| {
            let span = hi - lo;
            if span > 0.0 {
                span * figure.data_margin
            } else {
                0.5
            }
        };
        let (pad_x, pad_y) = (pad(min_x, max_x), pad(min_y, max_y));
        min_x -= pad_x;
        max_x += pad_x;
        min_y -= pad_y;
        max_y += pad_y;

        let (width_px, height_px) = figure.pixel_size();
        let [left, bottom, ax_w, ax_h] = figure.map_axes;
        let box_w = f64::from(ax_w) * f64::from(width_px);
        let box_h = f64::from(ax_h) * f64::from(height_px);

        let data_w = max_x - min_x;
        let data_h = (max_y - min_y) * aspect;
        let scale = (box_w / data_w).min(box_h / data_h);
        let fit_w = (data_w * scale / f64::from(width_px)) as f32;
        let fit_h = (data_h * scale / f64::from(height_px)) as f32;

        Self {
            bounds: [min_x, min_y, max_x, max_y],
            axes: [
                left + (ax_w - fit_w) / 2.0,
                bottom + (ax_h - fit_h) / 2.0,
                fit_w,
                fit_h,
            ],
        }
    }

    /// Переводит координаты данных в доли фигуры
    #[must_use]
    pub fn data_to_figure(&self, x: f64, y: f64) -> [f32; 2] {
        let [min_x, min_y, max_x, max_y] = self.bounds;
        let fx = ((x - min_x) / (max_x - min_x)) as f32;
        let fy = ((y - min_y) / (max_y - min_y)) as f32;
        self.axes_to_figure([fx, fy])
    }

    /// Переводит доли осей карты в доли фигуры
    #[must_use]
    pub fn axes_to_figure(&self, at: [f32; 2]) -> [f32; 2] {
        let [left, bottom, w, h] = self.axes;
        [left + at[0] * w, bottom + at[1] * h]
    }
}

/// Вытягивание по Y для географических координат: `1 / cos(средняя широта)`
#[must_use]
pub fn geographic_aspect(min_y: f64, max_y: f64) -> f64 {
    let cos = ((min_y + max_y) / 2.0).to_radians().cos();
    if cos > f64::EPSILON { 1.0 / cos } else { 1.0 }
}

/// Заливка одной провинции
#[derive(Debug, Clone, Serialize)]
pub struct ProvinceFill {
    pub id: u32,
    pub color: RgbaColor,
    #[serde(skip)]
    pub geometry: MultiPolygon<f64>,
}

/// Деление шкалы легенды
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

/// Горизонтальная градиентная легенда
#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    /// Прямоугольник полосы в долях фигуры `[left, bottom, width, height]`
    pub rect: [f32; 4],
    pub vmin: f64,
    pub vmax: f64,
    pub ticks: Vec<Tick>,
    pub tick_size: f32,
    pub title: Vec<TextItem>,
    pub caption: TextItem,
    #[serde(skip)]
    pub colormap: Colormap,
}

impl Legend {
    /// Цвет полосы в точке `t ∈ [0, 1]` по её ширине
    #[must_use]
    pub fn color_at(&self, t: f64) -> RgbaColor {
        RgbaColor::from_rgb(self.colormap.lookup(t))
    }
}

/// Среднее по стране: подпись и значение
#[derive(Debug, Clone, Serialize)]
pub struct AverageAnnotation {
    pub value: f64,
    pub caption: TextItem,
    pub figure: TextItem,
}

/// Граница провинций
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EdgeStyle {
    pub color: RgbaColor,
    pub width_pt: f32,
}

/// Полное описание карты
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: f32,
    pub background: RgbaColor,
    pub frame: MapFrame,
    pub fills: Vec<ProvinceFill>,
    pub edge: EdgeStyle,
    pub labels: Vec<ProvinceLabel>,
    pub legend: Legend,
    pub average: AverageAnnotation,
    pub watermark: TextItem,
    pub backdrop: Option<TextItem>,
}

impl Scene {
    /// Сцена в виде JSON (без геометрии)
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Цвет заливки для каждой провинции в порядке геометрии.
///
/// Провинции без значения получают `missing` и пишут предупреждение в лог.
#[must_use]
pub fn assign_colors(
    provinces: &[ProvinceShape],
    metrics: &MetricTable,
    mapper: &ScalarMapper,
    missing: RgbaColor,
) -> Vec<ProvinceFill> {
    provinces
        .iter()
        .map(|province| {
            let color = match metrics.get(province.id) {
                Some(value) => mapper.to_rgba(value),
                None => {
                    tracing::warn!(province = province.id, "нет значения показателя, серая заливка");
                    missing
                }
            };
            ProvinceFill {
                id: province.id,
                color,
                geometry: province.geometry.clone(),
            }
        })
        .collect()
}

/// «Круглые» деления в `[vmin, vmax]`: шаг 1, 2, 2.5 или 5 × 10ⁿ,
/// наименьший, при котором делений не больше `max_ticks`.
#[must_use]
pub fn nice_ticks(vmin: f64, vmax: f64, max_ticks: usize) -> Vec<Tick> {
    let span = vmax - vmin;
    let max_ticks = max_ticks.max(1);
    if span <= 0.0 || !span.is_finite() {
        return vec![Tick {
            value: vmin,
            label: format!("{vmin}"),
        }];
    }

    let magnitude = 10f64.powf((span / max_ticks as f64).log10().floor());
    let eps = span * 1e-9;
    let count = |step: f64| ((vmax + eps) / step).floor() - ((vmin - eps) / step).ceil() + 1.0;
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&step| count(step) <= max_ticks as f64)
        .unwrap_or(10.0 * magnitude);

    let decimals = decimals_for(step);
    let first = ((vmin - eps) / step).ceil() as i64;
    let last = ((vmax + eps) / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let value = i as f64 * step;
            Tick {
                value,
                label: format!("{value:.decimals$}"),
            }
        })
        .collect()
}

fn decimals_for(step: f64) -> usize {
    let mut decimals = 0;
    let mut scaled = step;
    while decimals < 10 && (scaled - scaled.round()).abs() > 1e-9 * scaled.abs().max(1.0) {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

/// Собирает сцену из провинций, таблицы показателя и настроек
pub fn build_scene(
    provinces: &[ProvinceShape],
    metrics: &MetricTable,
    settings: &RenderSettings,
) -> Result<Scene> {
    let palette = settings.palette()?;
    let (vmin, vmax) = metrics.min_max().ok_or(MapError::EmptyMetrics)?;
    let average = metrics.mean().ok_or(MapError::EmptyMetrics)?;

    let colormap = Colormap::new(&settings.ramp.ramp(), settings.ramp.lut_size);
    let mapper = ScalarMapper::new(
        Normalize::new(vmin, vmax),
        colormap.clone(),
        settings.ramp.alpha,
    );
    let fills = assign_colors(provinces, metrics, &mapper, palette.missing);

    let figure = &settings.figure;
    let (width_px, height_px) = figure.pixel_size();
    let data_bounds = province::bounds(provinces)
        .map_or([0.0, 0.0, 1.0, 1.0], |r| [r.min().x, r.min().y, r.max().x, r.max().y]);
    let aspect = if figure.geographic_aspect {
        geographic_aspect(data_bounds[1], data_bounds[3])
    } else {
        1.0
    };
    let frame = MapFrame::fit(data_bounds, figure, aspect);

    let label_settings = &settings.labels;
    let style = LabelStyle {
        font_size: label_settings.font_size,
        dark: palette.dark_text,
        light: palette.light_text,
        metric_caption: label_settings.metric_caption.clone(),
        decimals: label_settings.decimals,
    };
    let offsets = LabelOffsets::from_settings(&label_settings.offsets);
    let labels: Vec<ProvinceLabel> = provinces
        .iter()
        .map(|p| {
            let name = metrics.name(p.id).unwrap_or(label_settings.unknown_name.as_str());
            let label = place_label(p, name, metrics.get(p.id), average, &offsets, &style);
            tracing::debug!(province = p.id, name, position = ?label.position, "подпись");
            label
        })
        .collect();

    let legend = build_legend(settings, vmin, vmax, colormap, palette.dark_text);

    let notes = &settings.annotations;
    let average_note = AverageAnnotation {
        value: average,
        caption: TextItem::figure(
            notes.average_caption.as_str(),
            frame.axes_to_figure(notes.average_caption_pos),
            notes.average_caption_size,
            palette.dark_text,
        )
        .aligned(HAlign::Right, VAlign::Top),
        figure: TextItem::figure(
            format!("{average:.prec$}", prec = label_settings.decimals),
            frame.axes_to_figure(notes.average_value_pos),
            notes.average_value_size,
            palette.average_value,
        )
        .aligned(HAlign::Right, VAlign::Top),
    };

    let watermark = TextItem::figure(
        notes.watermark.as_str(),
        frame.axes_to_figure(notes.watermark_pos),
        notes.watermark_size,
        palette.dark_text,
    )
    .aligned(HAlign::Left, VAlign::Bottom);

    let backdrop = notes.backdrop.then(|| {
        let mut item = TextItem::figure(
            notes.watermark.repeat(notes.backdrop_repeat),
            frame.axes_to_figure([0.5, 0.5]),
            notes.watermark_size,
            palette.backdrop,
        );
        item.bold = false;
        item
    });

    Ok(Scene {
        width_px,
        height_px,
        dpi: figure.dpi,
        background: palette.background,
        frame,
        fills,
        edge: EdgeStyle {
            color: palette.edge,
            width_pt: figure.edge_width_pt,
        },
        labels,
        legend,
        average: average_note,
        watermark,
        backdrop,
    })
}

fn build_legend(
    settings: &RenderSettings,
    vmin: f64,
    vmax: f64,
    colormap: Colormap,
    text_color: RgbaColor,
) -> Legend {
    let legend = &settings.legend;
    let [left, bottom, width, height] = legend.rect;
    let center_x = left + width / 2.0;
    // отступ подписей от полосы: засечка + зазор, 3.5 pt каждый
    let pad = settings.figure.points_to_px(7.0) / settings.figure.pixel_size().1 as f32;

    let title = legend
        .title
        .iter()
        .zip(&legend.title_offsets)
        .map(|(line, &offset)| {
            TextItem::figure(
                line.as_str(),
                [center_x, bottom + offset * height],
                legend.title_size,
                text_color,
            )
        })
        .collect();

    let caption = TextItem::figure(
        legend.caption.as_str(),
        [center_x, bottom - pad],
        legend.caption_size,
        text_color,
    )
    .aligned(HAlign::Center, VAlign::Top);

    Legend {
        rect: legend.rect,
        vmin,
        vmax,
        ticks: nice_ticks(vmin, vmax, legend.max_ticks),
        tick_size: legend.tick_size,
        title,
        caption,
        colormap,
    }
}
