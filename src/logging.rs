use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. The level is `info` unless `debug` is set, in which
/// case it is `debug` and `RUST_LOG` may override it.
///
/// When `file` is given, output goes to that file through a non-blocking
/// writer instead of stderr. Calling this twice is a no-op.
pub fn init(debug: bool, file: Option<PathBuf>) {
    // Ignore `RUST_LOG` unless debug logging was asked for in the settings.
    let level = if debug { "debug" } else { "info" };
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let Some(path) = file else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        return;
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "socratic_lens.log".into());

    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .is_ok();
    if installed {
        let _ = FILE_GUARD.set(guard);
    }
}
