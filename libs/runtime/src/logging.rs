use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_target_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

type CatchAllFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Everything not claimed by an explicit section, up to `max_level`.
fn catch_all_filter(claimed: &[String], max_level: Level) -> CatchAllFilter {
    let claimed = claimed.to_vec();
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        !claimed
            .iter()
            .any(|prefix| matches_target_prefix(meta.target(), prefix))
            && meta.level() <= &max_level
    }))
}

// -------- rotating file writers --------
type Rotating = Arc<Mutex<FileRotate<AppendTimestamp>>>;

#[derive(Clone)]
struct RotWriterHandle(Option<Rotating>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file.lock().write(buf),
            // no sink for this target; drop silently
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to a file by target prefix, falling back to the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<Rotating>,
    by_prefix: Vec<(String, Rotating)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<Rotating> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_target_prefix(target, prefix))
            .map(|(_, file)| file.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RotWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RotWriterHandle(self.resolve_for(meta.target()))
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Open a size-rotated log file, creating its parent directory.
fn open_rotating(section: &Section, base_dir: &Path) -> std::io::Result<Rotating> {
    let log_path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(backups)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<Rotating> {
    if section.file.trim().is_empty() {
        return None;
    }
    match open_rotating(section, base_dir) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!(
                "Failed to open log file for '{}': {} ({})",
                name,
                resolve_log_path(&section.file, base_dir).display(),
                e
            );
            None
        }
    }
}

// -------- plan --------

/// Filters and sinks derived from a [`LoggingConfig`].
struct LoggingPlan {
    console_targets: Targets,
    file_targets: Targets,
    catch_all: Option<(Option<Level>, Option<Level>)>,
    claimed: Vec<String>,
    files: FileRouter,
}

fn plan(cfg: &LoggingConfig, base_dir: &Path) -> LoggingPlan {
    let mut console_targets = Targets::new().with_default(LevelFilter::OFF);
    let mut file_targets = Targets::new().with_default(LevelFilter::OFF);
    let mut files = FileRouter::default();
    let mut claimed = Vec::new();

    let mut sections: Vec<(&String, &Section)> =
        cfg.iter().filter(|(k, _)| k.as_str() != "default").collect();
    // longest prefix first so nested targets win
    sections.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    for (name, section) in sections {
        claimed.push(name.clone());
        if let Some(level) = parse_tracing_level(&section.console_level) {
            console_targets = console_targets.with_target(name.clone(), LevelFilter::from_level(level));
        }
        if let Some(file) = open_section_file(name, section, base_dir) {
            if let Some(level) = parse_tracing_level(&section.file_level) {
                file_targets = file_targets.with_target(name.clone(), LevelFilter::from_level(level));
            }
            files.by_prefix.push((name.clone(), file));
        }
    }

    let catch_all = cfg.get("default").map(|section| {
        files.default = open_section_file("default", section, base_dir);
        let file_level = files
            .default
            .as_ref()
            .and_then(|_| parse_tracing_level(&section.file_level));
        (parse_tracing_level(&section.console_level), file_level)
    });

    LoggingPlan {
        console_targets,
        file_targets,
        catch_all,
        claimed,
        files,
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually home_dir)
///
/// Installing twice is a no-op; the first subscriber stays.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{prelude::*, Registry};

    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let plan = plan(cfg, base_dir);
    // stdout carries command output; logs go to stderr
    let ansi = std::io::stderr().is_terminal();

    let console = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.console_targets);

    let explicit_files = (!plan.files.by_prefix.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(plan.files.clone())
            .with_filter(plan.file_targets)
    });

    let (console_default, file_default) = match plan.catch_all {
        Some((console_level, file_level)) => (
            console_level.map(|level| {
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_filter(catch_all_filter(&plan.claimed, level))
            }),
            file_level.filter(|_| !plan.files.is_empty()).map(|level| {
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(plan.files.clone())
                    .with_filter(catch_all_filter(&plan.claimed, level))
            }),
        ),
        None => (None, None),
    };

    let _ = Registry::default()
        .with(console)
        .with(explicit_files)
        .with(console_default)
        .with(file_default)
        .try_init();
}

// =================== tests ===================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO)); // defaults to INFO
    }

    #[test]
    fn test_target_prefix_matching() {
        assert!(matches_target_prefix("ngkit", "ngkit"));
        assert!(matches_target_prefix("ngkit::dispatch", "ngkit"));
        assert!(!matches_target_prefix("ngkit_inspect", "ngkit"));
        assert!(!matches_target_prefix("runtime", "ngkit"));
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(&absolute.to_string_lossy(), Path::new("/other")), absolute);
    }

    #[test]
    fn test_open_rotating_creates_parent() {
        let tmp = tempdir().unwrap();
        let s = section("info", "nested/dir/app.log", "debug");

        assert!(open_rotating(&s, tmp.path()).is_ok());
        assert!(tmp.path().join("nested/dir").is_dir());
    }

    #[test]
    fn test_plan_routes_sections_to_files() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("ngkit".into(), section("debug", "logs/ngkit.log", "trace"));
        cfg.insert("ngkit::host".into(), section("off", "logs/host.log", "debug"));
        cfg.insert("runtime".into(), section("info", "", ""));

        let plan = plan(&cfg, tmp.path());

        // longest prefix first
        assert_eq!(plan.claimed, vec!["ngkit::host", "runtime", "ngkit"]);
        assert_eq!(plan.files.by_prefix.len(), 2);
        // the default section has no file configured
        assert!(plan.files.default.is_none());
        assert_eq!(plan.catch_all, Some((Some(Level::WARN), None)));

        let host_file = plan.files.resolve_for("ngkit::host::memory").unwrap();
        let ngkit_file = plan.files.resolve_for("ngkit::dispatch").unwrap();
        assert!(!Arc::ptr_eq(&host_file, &ngkit_file));
        assert!(plan.files.resolve_for("other").is_none());
    }

    #[test]
    fn test_default_file_catches_unclaimed_targets() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "logs/all.log", "debug"));

        let plan = plan(&cfg, tmp.path());
        assert!(plan.files.resolve_for("anything").is_some());
        assert_eq!(plan.catch_all, Some((Some(Level::INFO), Some(Level::DEBUG))));
    }
}
