// src/province/label.rs
//! Подписи провинций
//!
//! Подпись ставится в центроид провинции со смещением из таблицы
//! [`LabelOffsets`] (провинции без записи остаются в центроиде).
//! Цвет текста выбирается по одному порогу: тёмный, если значение строго
//! меньше среднего по стране, иначе светлый. Шкала идёт от светлого к
//! тёмному, так что текст остаётся контрастным.

use std::collections::HashMap;

use serde::Serialize;

use crate::colormap::RgbaColor;
use crate::config::LabelOffset;
use crate::province::ProvinceShape;

/// Смещения подписей по идентификатору провинции, в единицах данных
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelOffsets {
    offsets: HashMap<u32, (f64, f64)>,
}

impl LabelOffsets {
    #[must_use]
    pub fn from_settings(offsets: &[LabelOffset]) -> Self {
        Self {
            offsets: offsets.iter().map(|o| (o.province, (o.dx, o.dy))).collect(),
        }
    }

    /// Смещение провинции или `(0, 0)`
    #[must_use]
    pub fn get(&self, province: u32) -> (f64, f64) {
        self.offsets.get(&province).copied().unwrap_or((0.0, 0.0))
    }
}

/// Оформление подписей
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub dark: RgbaColor,
    pub light: RgbaColor,
    pub metric_caption: String,
    pub decimals: usize,
}

/// Подпись одной провинции
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceLabel {
    pub id: u32,
    /// Точка привязки в координатах данных (центр текста)
    pub position: [f64; 2],
    pub color: RgbaColor,
    pub text: String,
    pub font_size: f32,
}

/// Тёмный текст строго ниже среднего, светлый на среднем и выше.
/// Без значения текст тёмный.
#[must_use]
pub fn text_color(value: Option<f64>, average: f64, style: &LabelStyle) -> RgbaColor {
    match value {
        Some(v) if v >= average => style.light,
        _ => style.dark,
    }
}

/// Текст подписи: название и значение, например `"Koshi\nHDI: 0.580"`
#[must_use]
pub fn label_text(name: &str, value: Option<f64>, style: &LabelStyle) -> String {
    match value {
        Some(v) => format!(
            "{name}\n{}: {v:.prec$}",
            style.metric_caption,
            prec = style.decimals
        ),
        None => format!("{name}\n{}: N/A", style.metric_caption),
    }
}

/// Ставит подпись провинции
#[must_use]
pub fn place_label(
    province: &ProvinceShape,
    name: &str,
    value: Option<f64>,
    average: f64,
    offsets: &LabelOffsets,
    style: &LabelStyle,
) -> ProvinceLabel {
    let (dx, dy) = offsets.get(province.id);
    ProvinceLabel {
        id: province.id,
        position: [province.centroid.x() + dx, province.centroid.y() + dy],
        color: text_color(value, average, style),
        text: label_text(name, value, style),
        font_size: style.font_size,
    }
}
