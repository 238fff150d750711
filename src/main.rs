use anyhow::{bail, Context};
use metro_vision::error::AppResult;
use metro_vision::{overlay, AnalyzerConfig, DigitRecognizer, Frame, SnapshotAnalyzer};
use std::path::PathBuf;

const USAGE: &str = "Usage: metro-vision <image> [--width N] [--height N] [--config FILE] [--annotate OUT.png] [--compact]";

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    image: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    config: Option<PathBuf>,
    annotate: Option<PathBuf>,
    compact: bool,
}

impl CliArgs {
    fn parse(args: &[String]) -> AppResult<Self> {
        let mut parsed = CliArgs::default();
        let mut image = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--width" => parsed.width = Some(parse_value(&mut iter, "--width")?),
                "--height" => parsed.height = Some(parse_value(&mut iter, "--height")?),
                "--config" => parsed.config = Some(PathBuf::from(next_value(&mut iter, "--config")?)),
                "--annotate" => {
                    parsed.annotate = Some(PathBuf::from(next_value(&mut iter, "--annotate")?))
                }
                "--compact" => parsed.compact = true,
                "-h" | "--help" => bail!("{}", USAGE),
                flag if flag.starts_with("--") => bail!("Unknown option {}\n{}", flag, USAGE),
                path if image.is_none() => image = Some(PathBuf::from(path)),
                extra => bail!("Unexpected argument {}\n{}", extra, USAGE),
            }
        }

        parsed.image = image.with_context(|| USAGE.to_string())?;
        Ok(parsed)
    }
}

fn next_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> AppResult<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn parse_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> AppResult<u32> {
    let raw = next_value(iter, flag)?;
    raw.parse()
        .with_context(|| format!("{} expects a positive integer, got {:?}", flag, raw))
}

/// Initialize tracing with file rotation
///
/// Logs are written to `<local data dir>/metro-vision/logs/` (falls back to
/// `./logs`), one file per day. The console layer goes to stderr so stdout
/// carries only the JSON snapshot.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("metro-vision").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "metro-vision.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!("Log directory: {}", log_dir.display());
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &AnalyzerConfig) -> Box<dyn DigitRecognizer + Send + Sync> {
    let datapath = config
        .ocr
        .datapath
        .clone()
        .or_else(metro_vision::TesseractRecognizer::bundled_tessdata_path);
    Box::new(metro_vision::TesseractRecognizer::new(
        datapath,
        config.ocr.language_or_default(),
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_config: &AnalyzerConfig) -> Box<dyn DigitRecognizer + Send + Sync> {
    tracing::warn!("Built without Tesseract; counters will read 0");
    Box::new(metro_vision::NoOcr)
}

fn run(args: CliArgs) -> AppResult<()> {
    let config = match &args.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::load_default()?,
    };

    let frame = Frame::open(&args.image)?;
    let width = args.width.unwrap_or(frame.width());
    let height = args.height.unwrap_or(frame.height());
    tracing::info!(
        "Analyzing {} ({}x{} frame, {}x{} window)",
        args.image.display(),
        frame.width(),
        frame.height(),
        width,
        height
    );

    let analyzer = SnapshotAnalyzer::from_config(build_recognizer(&config), &config);
    let snapshot = analyzer.analyze(&frame, width, height);

    if !snapshot.is_game_running() {
        tracing::warn!("Score reads 0; the frame may not show a running game");
    }

    let json = if args.compact {
        serde_json::to_string(&snapshot)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{}", json);

    if let Some(out) = &args.annotate {
        overlay::annotate(&frame, width, height, analyzer.regions(), &snapshot)
            .save(out)
            .with_context(|| format!("Failed to write overlay to {}", out.display()))?;
        tracing::info!("✓ Overlay written to {}", out.display());
    }

    Ok(())
}

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match CliArgs::parse(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    initialize_tracing();

    if let Err(e) = run(args) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let parsed = CliArgs::parse(&args(&[
            "shot.png",
            "--width",
            "1920",
            "--height",
            "1080",
            "--config",
            "regions.json",
            "--annotate",
            "out.png",
            "--compact",
        ]))
        .unwrap();

        assert_eq!(parsed.image, PathBuf::from("shot.png"));
        assert_eq!(parsed.width, Some(1920));
        assert_eq!(parsed.height, Some(1080));
        assert_eq!(parsed.config, Some(PathBuf::from("regions.json")));
        assert_eq!(parsed.annotate, Some(PathBuf::from("out.png")));
        assert!(parsed.compact);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(CliArgs::parse(&args(&[])).is_err());
        assert!(CliArgs::parse(&args(&["a.png", "--width"])).is_err());
        assert!(CliArgs::parse(&args(&["a.png", "--width", "-3"])).is_err());
        assert!(CliArgs::parse(&args(&["a.png", "--bogus"])).is_err());
        assert!(CliArgs::parse(&args(&["a.png", "b.png"])).is_err());
    }
}
