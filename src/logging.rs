use log::{info, LevelFilter};

/// Environment variable that overrides the log level
pub const LOG_LEVEL_ENV: &str = "SOLO_PLAYER_LOG_LEVEL";

/// Map a level name to a filter, falling back to `default` for anything
/// unrecognised
pub fn parse_level(name: &str, default: LevelFilter) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => default,
    }
}

/// Initialize logging with the default level (`warn`) unless
/// `SOLO_PLAYER_LOG_LEVEL` says otherwise
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_default(LevelFilter::Warn)
}

pub fn init_with_default(default: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .map(|name| parse_level(&name, default))
        .unwrap_or(default);

    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}:{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });
    builder.filter_level(level);
    builder.try_init()?;

    info!("Logging initialized with level: {}", level);
    Ok(())
}
