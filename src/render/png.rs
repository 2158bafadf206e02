// src/render/png.rs
//! Сохранение готовой карты в PNG
//!
//! Каталог назначения не создаётся: если его нет, ошибка записи
//! поднимается к вызывающему коду как есть.
//!
//! После записи файл можно открыть в системном просмотрщике ([`show_png`]).

use std::path::Path;

use image::RgbaImage;

use crate::error::Result;

/// Сохраняет изображение в PNG-файл
///
/// # Пример
/// ```rust,no_run
/// # use image::{Rgba, RgbaImage};
/// let img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
/// hdimap::render::png::save_png(&img, "output/map.png".as_ref())?;
/// # Ok::<(), hdimap::MapError>(())
/// ```
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    tracing::info!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "карта сохранена"
    );
    Ok(())
}

/// Открывает файл в просмотрщике по умолчанию.
/// Если просмотрщик не запустился, карта уже сохранена: только предупреждение.
pub fn show_png(path: &Path) {
    match open::that(path) {
        Ok(()) => tracing::info!(path = %path.display(), "карта открыта в просмотрщике"),
        Err(err) => tracing::warn!(path = %path.display(), %err, "не удалось открыть просмотрщик"),
    }
}
