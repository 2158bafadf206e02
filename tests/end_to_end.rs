use std::fs;
use std::path::Path;

use hdimap::render::text::TextPainter;
use hdimap::{ChoroplethRenderer, MapError, RenderSettings};

const HDI_CSV: &str = "\
Province,Pname,HDI
1,Koshi,0.580
2,Madhesh,0.519
3,Bagmati,0.669
4,Gandaki,0.621
5,Lumbini,0.563
6,Karnali,0.538
7,Sudurpaschim,0.547
";

/// Семь квадратных «провинций» в ряд, по градусу каждая
fn provinces_geojson() -> String {
    let features: Vec<String> = (1..=7)
        .map(|id| {
            let x = 80 + id - 1;
            format!(
                r#"{{"type":"Feature","properties":{{"PROVINCE":{id}}},"geometry":{{"type":"Polygon","coordinates":[[[{x},27],[{x1},27],[{x1},28],[{x},28],[{x},27]]]}}}}"#,
                x1 = x + 1
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}

fn settings_in(dir: &Path) -> RenderSettings {
    fs::write(dir.join("province_hdi.csv"), HDI_CSV).unwrap();
    fs::write(dir.join("provinces.geojson"), provinces_geojson()).unwrap();

    let mut settings = RenderSettings::default();
    settings.data_path = dir.join("province_hdi.csv");
    settings.geometry_path = dir.join("provinces.geojson");
    settings.output_path = dir.join("nepal_hdi.png");
    settings.figure.dpi = 50.0;
    settings
}

#[test]
fn renders_seven_provinces_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let output = settings.output_path.clone();

    let renderer = ChoroplethRenderer::new(settings).unwrap();
    let scene = renderer.render().unwrap();

    assert_eq!(scene.fills.len(), 7);
    assert_eq!(scene.labels.len(), 7);
    assert_eq!(scene.legend.title.len(), 2);
    assert_eq!(scene.average.figure.text, "0.577");
    assert_eq!(scene.watermark.text, "@viz.onnepal");

    let bytes = fs::read(&output).unwrap();
    assert!(!bytes.is_empty());
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (600, 400));
}

#[test]
fn scene_json_lists_labels_in_geometry_order() {
    let dir = tempfile::tempdir().unwrap();
    let renderer =
        ChoroplethRenderer::with_painter(settings_in(dir.path()), TextPainter::without_font());
    let scene = renderer.scene().unwrap();

    let json: serde_json::Value = serde_json::from_str(&scene.to_json().unwrap()).unwrap();
    let labels = json["labels"].as_array().unwrap();
    let ids: Vec<u64> = labels.iter().map(|l| l["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(labels[0]["text"], "Koshi\nHDI: 0.580");
    assert!(json["fills"][0].get("geometry").is_none());
}

#[test]
fn offsets_and_missing_values_come_from_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    fs::write(
        &settings.data_path,
        "Province,Pname,HDI\n1,Koshi,0.580\n2,Madhesh,\n3,Bagmati,0.669\n",
    )
    .unwrap();
    let config = RenderSettings::from_toml_str(
        r"
        [[labels.offsets]]
        province = 1
        dx = 0.2
        dy = 0.3
        ",
    )
    .unwrap();
    settings.labels = config.labels;

    let renderer = ChoroplethRenderer::with_painter(settings, TextPainter::without_font());
    let scene = renderer.scene().unwrap();

    let gray = hdimap::colormap::RgbaColor::from_hex("#808080").unwrap();
    let fill = |id: u32| scene.fills.iter().find(|f| f.id == id).unwrap().color;
    assert_eq!(fill(2), gray);
    assert_eq!(fill(7), gray);
    assert_ne!(fill(1), gray);

    let label = |id: u32| scene.labels.iter().find(|l| l.id == id).unwrap();
    assert!((label(1).position[0] - 80.7).abs() < 1e-9);
    assert!((label(1).position[1] - 27.8).abs() < 1e-9);
    // смещение Madhesh по умолчанию заменено конфигурацией
    assert!((label(2).position[1] - 27.5).abs() < 1e-9);
    assert_eq!(label(2).text, "Madhesh\nHDI: N/A");
    assert_eq!(label(7).text, "Unknown\nHDI: N/A");
}

#[test]
fn missing_output_directory_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.output_path = dir.path().join("output").join("nepal_hdi.png");

    let renderer = ChoroplethRenderer::with_painter(settings, TextPainter::without_font());
    let err = renderer.render().unwrap_err();
    assert!(matches!(err, MapError::Image(_) | MapError::Io(_)));
}
