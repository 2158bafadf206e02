// src/colormap.rs
//! Цветовая шкала показателя
//!
//! Значение показателя (HDI) превращается в цвет в три шага:
//! 1. **Нормализация** — линейно по глобальным min/max таблицы в `[0, 1]`.
//! 2. **Шкала** — кусочно-линейная интерполяция между опорными цветами
//!    ([`ColorRamp`]), заранее разложенная в таблицу из `lut_size` оттенков
//!    ([`Colormap`]).
//! 3. **Прозрачность** — считается от *исходного* значения, а не от
//!    нормализованного: `alpha = 0.5 + 0.5 * value` ([`AlphaRule`]).
//!
//! Шкала по умолчанию идёт от светло-розового к тёмно-фиолетовому, поэтому
//! большие значения всегда темнее.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// Цвет RGBA с компонентами в диапазоне `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RgbaColor {
    pub const BLACK: Self = Self::opaque(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::opaque(1.0, 1.0, 1.0);

    #[must_use]
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self::opaque(rgb[0], rgb[1], rgb[2])
    }

    /// Разбирает цвет в формате `"#rrggbb"` (альфа = 1)
    pub fn from_hex(value: &str) -> Result<Self> {
        let invalid = || MapError::InvalidColor(value.to_string());
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|c| f32::from(c) / 255.0)
                .map_err(|_| invalid())
        };
        Ok(Self::opaque(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Переводит цвет в пиксель `image` (8 бит на канал)
    #[must_use]
    pub fn to_pixel(self) -> Rgba<u8> {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([q(self.r), q(self.g), q(self.b), q(self.a)])
    }

    /// Относительная яркость (веса Rec. 709)
    #[must_use]
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

/// Кусочно-линейная шкала по опорным точкам `(позиция, RGB)`
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    anchors: Vec<(f32, [f32; 3])>,
}

impl ColorRamp {
    /// Создаёт шкалу из опорных точек; точки сортируются по позиции.
    #[must_use]
    pub fn new(mut anchors: Vec<(f32, [f32; 3])>) -> Self {
        anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { anchors }
    }

    /// Шкала из списка цветов, равномерно разложенных по `[0, 1]`
    ///
    /// # Пример
    /// ```
    /// use hdimap::colormap::ColorRamp;
    /// let ramp = ColorRamp::from_colors(&[[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]]);
    /// assert_eq!(ramp.sample(0.5), [0.5, 0.5, 0.5]);
    /// ```
    #[must_use]
    pub fn from_colors(colors: &[[f32; 3]]) -> Self {
        let last = colors.len().saturating_sub(1).max(1) as f32;
        Self::new(
            colors
                .iter()
                .enumerate()
                .map(|(i, &c)| (i as f32 / last, c))
                .collect(),
        )
    }

    #[must_use]
    pub fn anchors(&self) -> &[(f32, [f32; 3])] {
        &self.anchors
    }

    /// Цвет шкалы в точке `t` (за пределами опорных точек берётся крайний цвет)
    #[must_use]
    pub fn sample(&self, t: f32) -> [f32; 3] {
        let Some(&(first_pos, first)) = self.anchors.first() else {
            return [0.0, 0.0, 0.0];
        };
        let (last_pos, last) = self.anchors[self.anchors.len() - 1];
        if t <= first_pos {
            return first;
        }
        if t >= last_pos {
            return last;
        }
        for pair in self.anchors.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                let frac = if span > 0.0 { (t - p0) / span } else { 1.0 };
                return [
                    c0[0] + (c1[0] - c0[0]) * frac,
                    c0[1] + (c1[1] - c0[1]) * frac,
                    c0[2] + (c1[2] - c0[2]) * frac,
                ];
            }
        }
        last
    }
}

/// Линейная нормализация `[vmin, vmax] → [0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    #[must_use]
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// Нормализует значение; при `vmin == vmax` любое значение даёт 0.
    /// Результат не обрезается: значения вне диапазона выходят за `[0, 1]`.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span == 0.0 {
            0.0
        } else {
            (value - self.vmin) / span
        }
    }
}

/// Шкала, разложенная в таблицу из `N` оттенков
#[derive(Debug, Clone)]
pub struct Colormap {
    lut: Vec<[f32; 3]>,
}

impl Colormap {
    /// Строит таблицу: оттенок `i` берётся в точке `i / (N - 1)`.
    #[must_use]
    pub fn new(ramp: &ColorRamp, lut_size: usize) -> Self {
        let n = lut_size.max(2);
        let last = (n - 1) as f32;
        let lut = (0..n).map(|i| ramp.sample(i as f32 / last)).collect();
        Self { lut }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lut.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }

    /// Оттенок для нормализованного значения: индекс `floor(x * N)`,
    /// `x = 1` попадает в последний оттенок, выход за `[0, 1]` обрезается.
    #[must_use]
    pub fn lookup(&self, x: f64) -> [f32; 3] {
        let n = self.lut.len();
        if x.is_nan() || x <= 0.0 {
            return self.lut[0];
        }
        let idx = ((x * n as f64) as usize).min(n - 1);
        self.lut[idx]
    }
}

/// Прозрачность как линейная функция исходного значения
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaRule {
    pub base: f64,
    pub slope: f64,
}

impl Default for AlphaRule {
    fn default() -> Self {
        Self {
            base: 0.5,
            slope: 0.5,
        }
    }
}

impl AlphaRule {
    /// `base + slope * value`, обрезанное до `[0, 1]`
    #[must_use]
    pub fn apply(&self, value: f64) -> f32 {
        (self.base + self.slope * value).clamp(0.0, 1.0) as f32
    }
}

/// Отображение значения показателя в цвет заливки
#[derive(Debug, Clone)]
pub struct ScalarMapper {
    pub norm: Normalize,
    pub cmap: Colormap,
    pub alpha: AlphaRule,
}

impl ScalarMapper {
    #[must_use]
    pub fn new(norm: Normalize, cmap: Colormap, alpha: AlphaRule) -> Self {
        Self { norm, cmap, alpha }
    }

    /// Цвет заливки: оттенок от нормализованного значения,
    /// прозрачность от исходного.
    #[must_use]
    pub fn to_rgba(&self, value: f64) -> RgbaColor {
        self.color_at(value).with_alpha(self.alpha.apply(value))
    }

    /// Непрозрачный оттенок шкалы (для легенды)
    #[must_use]
    pub fn color_at(&self, value: f64) -> RgbaColor {
        RgbaColor::from_rgb(self.cmap.lookup(self.norm.apply(value)))
    }
}
