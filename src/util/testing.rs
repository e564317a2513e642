//! Test support: tracing setup and document fixtures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // quick-xml and walkdir are not instrumented, keep the list for future noise
    let noisy_modules: [&str; 0] = [];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Write `content` to `dir/name` and return the full path.
///
/// Panics on I/O failure; fixtures are test-only.
pub fn write_document(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content)
        .unwrap_or_else(|e| panic!("cannot write fixture {}: {}", path.display(), e));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
        init_test_setup();
    }

    #[test]
    fn given_dir_when_write_document_then_file_has_content() {
        let dir = env::temp_dir().join(format!("rsconf-fixture-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let path = write_document(&dir, "a.xml", "<a/>");

        assert_eq!(fs::read_to_string(&path).unwrap(), "<a/>");
        fs::remove_dir_all(&dir).unwrap();
    }
}
