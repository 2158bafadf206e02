use clap::Parser;
use hdimap::{ChoroplethRenderer, RenderSettings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Хороплет индекса человеческого развития по провинциям Непала
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML (по умолчанию встроенные настройки)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Путь для сохранения PNG (переопределяет `output_path` из конфигурации)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Открыть готовую карту в системном просмотрщике
    #[arg(long)]
    show: bool,

    /// Дополнительно сохранить описание сцены в JSON
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Уровень логирования, если не задан RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    let mut settings = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "загрузка конфигурации");
            RenderSettings::from_toml_file(path)?
        }
        None => RenderSettings::default(),
    };
    if let Some(output) = cli.output {
        settings.output_path = output;
    }
    if cli.show {
        settings.figure.show = true;
    }

    let renderer = ChoroplethRenderer::new(settings)?;
    let scene = renderer.render()?;

    if let Some(path) = cli.scene {
        std::fs::write(&path, scene.to_json()?)?;
        info!(path = %path.display(), "сцена сохранена");
    }

    info!(
        output = %renderer.settings().output_path.display(),
        "готово"
    );
    Ok(())
}
