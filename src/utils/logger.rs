use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Level used when `RUST_LOG` is unset or unparseable
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Installs the global console logger.
///
/// Lines look like `2024-01-01 12:00:00 [INFO] message`. The level comes
/// from `RUST_LOG` and falls back to info.
///
/// # Errors
/// * If a global logger is already installed
pub fn setup_logger() -> Result<()> {
    let level = parse_level(std::env::var("RUST_LOG").ok().as_deref());
    Dispatch::new()
        .level(level)
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}

fn parse_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|level| level.trim().parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}
