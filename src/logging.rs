use std::{env, fmt::Display, str::FromStr};

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, SetLoggerError};
use thiserror::Error;

/// Sets how chatty SHAMS itself is, e.g. `debug` while chasing an allocation problem
pub const LOG_LEVEL_VAR: &str = "SHAMS_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("SHAMS_LOG must be one of off, error, warn, info, debug, trace, got {0:?}")]
    InvalidLevel(String),
    #[error(transparent)]
    Install(#[from] SetLoggerError),
}

pub fn init_logger() -> Result<(), LoggingError> {
    let filter = LogFilter::parse(env::var(LOG_LEVEL_VAR).ok().as_deref())?;

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let origin = Origin::of(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_badge(record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                origin,
                message
            ))
        })
        .level(filter.local.max(LogFilter::EXTERNAL))
        .filter(move |meta| filter.allows(meta))
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

/// Our own crates log at the configured level, dependencies only warnings and errors
#[derive(Debug, Clone, Copy, PartialEq)]
struct LogFilter {
    local: LevelFilter,
}

impl LogFilter {
    const EXTERNAL: LevelFilter = LevelFilter::Warn;

    fn parse(level: Option<&str>) -> Result<Self, LoggingError> {
        let local = match level.map(str::trim).filter(|l| !l.is_empty()) {
            Some(level) => LevelFilter::from_str(level)
                .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?,
            None => LevelFilter::Info,
        };

        Ok(Self { local })
    }

    fn allows(&self, meta: &Metadata) -> bool {
        self.allows_level(&Origin::of(meta.target()), meta.level())
    }

    fn allows_level(&self, origin: &Origin, level: Level) -> bool {
        if origin.is_ours() {
            level <= self.local
        } else {
            level <= Self::EXTERNAL
        }
    }
}

/// The crate a log record came from
#[derive(Debug, PartialEq)]
enum Origin {
    Dependency(String),
    App,
    Server,
    Collab,
    Core,
}

impl Origin {
    fn of(target: &str) -> Self {
        match target.split("::").next().unwrap_or_default() {
            "shams" => Self::App,
            "shams_core" => Self::Core,
            "shams_server" => Self::Server,
            "shams_collab" => Self::Collab,
            other => Self::Dependency(other.to_string()),
        }
    }

    fn is_ours(&self) -> bool {
        !matches!(self, Self::Dependency(_))
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Dependency(name) => name.as_str().clear(),
            Self::App => "SHAMS".bright_cyan(),
            Self::Server => "SERVER".bright_green(),
            Self::Collab => "COLLAB".bright_purple(),
            Self::Core => "CORE".blue(),
        };

        Display::fmt(&label, f)
    }
}

fn level_badge(level: Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}

#[cfg(test)]
mod test {
    use log::{Level, LevelFilter};

    use super::{LogFilter, LoggingError, Origin};

    #[test]
    fn origins_follow_the_crate() {
        assert_eq!(Origin::of("shams_collab::allocation"), Origin::Collab);
        assert_eq!(Origin::of("shams_server"), Origin::Server);
        assert_eq!(Origin::of("shams"), Origin::App);
        assert_eq!(
            Origin::of("sqlx::query"),
            Origin::Dependency("sqlx".to_string())
        );
        assert!(!Origin::of("hyper::proto").is_ours());
    }

    #[test]
    fn info_is_the_default_level() {
        let filter = LogFilter::parse(None).unwrap();
        assert_eq!(filter.local, LevelFilter::Info);
        assert_eq!(LogFilter::parse(Some(" ")).unwrap(), filter);

        assert!(filter.allows_level(&Origin::Collab, Level::Info));
        assert!(!filter.allows_level(&Origin::Collab, Level::Debug));
        assert!(!filter.allows_level(&Origin::of("sqlx"), Level::Info));
        assert!(filter.allows_level(&Origin::of("sqlx"), Level::Warn));
    }

    #[test]
    fn debug_only_opens_up_our_crates() {
        let filter = LogFilter::parse(Some("debug")).unwrap();

        assert!(filter.allows_level(&Origin::Server, Level::Debug));
        assert!(!filter.allows_level(&Origin::Server, Level::Trace));
        assert!(!filter.allows_level(&Origin::of("hyper"), Level::Debug));
    }

    #[test]
    fn unknown_levels_are_refused() {
        assert!(matches!(
            LogFilter::parse(Some("loud")),
            Err(LoggingError::InvalidLevel(level)) if level == "loud"
        ));
    }
}
