// src/config.rs
//! Конфигурация рендеринга карты
//!
//! Все параметры, которые раньше были зашиты в скрипт, собраны здесь:
//! - пути к входным данным и к итоговому PNG
//! - имена колонок таблицы и атрибута геометрии
//! - размер фигуры, DPI и положение осей карты
//! - опорные цвета шкалы, цвет «нет данных» и правило прозрачности
//! - стиль подписей и таблица смещений подписей по провинциям
//! - тексты, позиции и размеры легенды и аннотаций
//!
//! Значения по умолчанию воспроизводят карту HDI провинций Непала.
//! Любое поле можно переопределить в TOML-файле, остальные возьмутся из `Default`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::colormap::{AlphaRule, ColorRamp, RgbaColor};
use crate::error::Result;

/// Имена колонок входных данных
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnSettings {
    /// Колонка CSV с идентификатором провинции
    pub id: String,
    /// Колонка CSV с названием провинции
    pub name: String,
    /// Колонка CSV со значением показателя
    pub value: String,
    /// Атрибут геометрии с идентификатором провинции
    pub geometry_id: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            id: "Province".to_string(),
            name: "Pname".to_string(),
            value: "HDI".to_string(),
            geometry_id: "PROVINCE".to_string(),
        }
    }
}

/// Размер и разметка фигуры
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FigureSettings {
    /// Ширина фигуры в дюймах
    pub width_in: f32,
    /// Высота фигуры в дюймах
    pub height_in: f32,
    pub dpi: f32,
    /// Цвет фона `"#rrggbb"`
    pub background: String,
    /// Прямоугольник осей карты в долях фигуры: `[left, bottom, width, height]`
    pub map_axes: [f32; 4],
    /// Поле вокруг границ данных (доля размаха по каждой оси)
    pub data_margin: f64,
    /// Растягивать ось Y на `1 / cos(средняя широта)`, как для географических координат
    pub geographic_aspect: bool,
    /// Цвет границ провинций
    pub edge_color: String,
    /// Толщина границ в пунктах
    pub edge_width_pt: f32,
    /// Открыть сохранённый PNG в системном просмотрщике
    pub show: bool,
}

impl Default for FigureSettings {
    fn default() -> Self {
        Self {
            width_in: 12.0,
            height_in: 8.0,
            dpi: 300.0,
            background: "#ffffff".to_string(),
            map_axes: [0.02, 0.02, 0.96, 0.96],
            data_margin: 0.05,
            geographic_aspect: true,
            edge_color: "#000000".to_string(),
            edge_width_pt: 1.0,
            show: false,
        }
    }
}

impl FigureSettings {
    /// Размер итогового изображения в пикселях
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round().max(1.0) as u32,
            (self.height_in * self.dpi).round().max(1.0) as u32,
        )
    }

    /// Переводит размер в пунктах в пиксели при текущем DPI
    #[must_use]
    pub fn points_to_px(&self, points: f32) -> f32 {
        points * self.dpi / 72.0
    }
}

/// Цветовая шкала заливки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RampSettings {
    /// Опорные цвета от минимума к максимуму, равномерно по шкале
    pub colors: Vec<[f32; 3]>,
    /// Число оттенков в таблице шкалы
    pub lut_size: usize,
    /// Заливка провинций без значения показателя
    pub missing_color: String,
    /// Прозрачность: `base + slope * value` от исходного значения
    pub alpha: AlphaRule,
}

impl Default for RampSettings {
    fn default() -> Self {
        Self {
            colors: vec![
                [1.0, 0.8, 1.0],
                [0.9, 0.6, 0.9],
                [0.8, 0.4, 0.8],
                [0.7, 0.2, 0.7],
                [0.6, 0.0, 0.6],
                [0.5, 0.0, 0.5],
            ],
            lut_size: 256,
            missing_color: "#808080".to_string(),
            alpha: AlphaRule::default(),
        }
    }
}

impl RampSettings {
    #[must_use]
    pub fn ramp(&self) -> ColorRamp {
        ColorRamp::from_colors(&self.colors)
    }
}

/// Смещение подписи одной провинции относительно центроида (в единицах данных)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LabelOffset {
    pub province: u32,
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

/// Стиль подписей провинций
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelSettings {
    pub font_size: f32,
    /// Цвет текста для значений ниже среднего
    pub dark_color: String,
    /// Цвет текста для значений не ниже среднего
    pub light_color: String,
    /// Подпись показателя во второй строке (`"HDI: 0.580"`)
    pub metric_caption: String,
    /// Знаков после запятой
    pub decimals: usize,
    /// Название для провинций, которых нет в таблице
    pub unknown_name: String,
    pub offsets: Vec<LabelOffset>,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            dark_color: "#000000".to_string(),
            light_color: "#ffffff".to_string(),
            metric_caption: "HDI".to_string(),
            decimals: 3,
            unknown_name: "Unknown".to_string(),
            offsets: vec![
                LabelOffset {
                    province: 5,
                    dx: 0.0,
                    dy: -0.1,
                },
                LabelOffset {
                    province: 2,
                    dx: 0.0,
                    dy: -0.6,
                },
            ],
        }
    }
}

/// Легенда: градиентная полоса с заголовком
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LegendSettings {
    /// Прямоугольник полосы в долях фигуры: `[left, bottom, width, height]`
    pub rect: [f32; 4],
    /// Строки заголовка сверху вниз
    pub title: Vec<String>,
    /// Вертикальные позиции строк заголовка в долях высоты полосы
    pub title_offsets: Vec<f32>,
    pub title_size: f32,
    /// Подпись под полосой
    pub caption: String,
    pub caption_size: f32,
    pub tick_size: f32,
    /// Максимальное число делений
    pub max_ticks: usize,
}

impl Default for LegendSettings {
    fn default() -> Self {
        Self {
            rect: [0.75, 0.8, 0.2, 0.03],
            title: vec![
                "HDI Distribution Across".to_string(),
                "Provinces".to_string(),
            ],
            title_offsets: vec![4.7, 3.2],
            title_size: 20.0,
            caption: "HDI".to_string(),
            caption_size: 10.0,
            tick_size: 10.0,
            max_ticks: 5,
        }
    }
}

/// Среднее по стране и водяной знак
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotationSettings {
    pub average_caption: String,
    /// Позиция подписи среднего в долях осей карты (выравнивание: справа, сверху)
    pub average_caption_pos: [f32; 2],
    pub average_caption_size: f32,
    /// Позиция значения среднего в долях осей карты (выравнивание: справа, сверху)
    pub average_value_pos: [f32; 2],
    pub average_value_size: f32,
    pub average_value_color: String,
    pub watermark: String,
    /// Позиция водяного знака в долях осей карты (выравнивание: слева, снизу)
    pub watermark_pos: [f32; 2],
    pub watermark_size: f32,
    /// Повторённый водяной знак на фоне карты
    pub backdrop: bool,
    pub backdrop_repeat: usize,
    pub backdrop_color: String,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            average_caption: "ALL NEPAL AVG".to_string(),
            average_caption_pos: [0.93, 0.64],
            average_caption_size: 20.0,
            average_value_pos: [0.88, 0.6],
            average_value_size: 32.0,
            average_value_color: "#ffd700".to_string(),
            watermark: "@viz.onnepal".to_string(),
            watermark_pos: [0.02, 0.02],
            watermark_size: 12.0,
            backdrop: false,
            backdrop_repeat: 20,
            // lightgray с прозрачностью 0.5 поверх белого
            backdrop_color: "#e9e9e9".to_string(),
        }
    }
}

/// Шрифт для всех надписей
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FontSettings {
    /// Путь к TTF/OTF. Если не задан, ищется системный жирный шрифт.
    pub path: Option<PathBuf>,
    /// Имитировать жирное начертание двойной отрисовкой
    pub synthetic_bold: bool,
}

/// Полная конфигурация одного рендера
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Таблица показателя (CSV)
    pub data_path: PathBuf,
    /// Границы провинций (`.shp` или `.geojson`)
    pub geometry_path: PathBuf,
    /// Итоговый PNG
    pub output_path: PathBuf,
    pub columns: ColumnSettings,
    pub figure: FigureSettings,
    pub ramp: RampSettings,
    pub labels: LabelSettings,
    pub legend: LegendSettings,
    pub annotations: AnnotationSettings,
    pub font: FontSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data/province_hdi.csv"),
            geometry_path: PathBuf::from("./maps/nepal/province/hermes_NPL_new_wgs_1.shp"),
            output_path: PathBuf::from("./output/nepal_hdi_insta.png"),
            columns: ColumnSettings::default(),
            figure: FigureSettings::default(),
            ramp: RampSettings::default(),
            labels: LabelSettings::default(),
            legend: LegendSettings::default(),
            annotations: AnnotationSettings::default(),
            font: FontSettings::default(),
        }
    }
}

impl RenderSettings {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # nepal.toml
    /// output_path = "out/hdi.png"
    ///
    /// [figure]
    /// dpi = 150
    ///
    /// [[labels.offsets]]
    /// province = 2
    /// dy = -0.6
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Разбирает все цвета, заданные строками, в одну палитру
    pub fn palette(&self) -> Result<Palette> {
        Ok(Palette {
            background: RgbaColor::from_hex(&self.figure.background)?,
            edge: RgbaColor::from_hex(&self.figure.edge_color)?,
            missing: RgbaColor::from_hex(&self.ramp.missing_color)?,
            dark_text: RgbaColor::from_hex(&self.labels.dark_color)?,
            light_text: RgbaColor::from_hex(&self.labels.light_color)?,
            average_value: RgbaColor::from_hex(&self.annotations.average_value_color)?,
            backdrop: RgbaColor::from_hex(&self.annotations.backdrop_color)?,
        })
    }
}

/// Цвета конфигурации после разбора
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: RgbaColor,
    pub edge: RgbaColor,
    pub missing: RgbaColor,
    pub dark_text: RgbaColor,
    pub light_text: RgbaColor,
    pub average_value: RgbaColor,
    pub backdrop: RgbaColor,
}
