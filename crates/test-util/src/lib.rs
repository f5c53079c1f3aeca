use std::path::PathBuf;
use std::sync::Once;

use color_eyre::eyre;
use helmchk_core::{Path, PathSet};
use vfs::VfsPath;

pub mod prelude {
    pub use crate::matchers::*;
    pub use crate::write;
    pub use crate::{Builder, LogLevel, path_set};
    pub use googletest::{assert_that, matcher::MatcherBase, matchers::*};
    pub use similar_asserts::assert_eq as sim_assert_eq;
}

/// Returns the workspace root directory via the `CARGO_WORKSPACE_DIR` env var
/// set in `.cargo/config.toml`.
///
/// # Panics
///
/// Panics if `CARGO_WORKSPACE_DIR` is not set.
#[must_use]
pub fn workspace_root() -> PathBuf {
    PathBuf::from(
        std::env::var("CARGO_WORKSPACE_DIR")
            .expect("CARGO_WORKSPACE_DIR must be set in .cargo/config.toml"),
    )
}

/// Returns the path to the workspace `testdata/` directory.
#[must_use]
pub fn workspace_testdata() -> PathBuf {
    workspace_root().join("testdata")
}

/// Returns the directory of the fixture chart `name` below `testdata/charts/`.
#[must_use]
pub fn testdata_chart(name: &str) -> PathBuf {
    workspace_testdata().join("charts").join(name)
}

/// Reads a file relative to the workspace `testdata/` directory.
///
/// # Panics
///
/// Panics if the file cannot be read.
#[must_use]
pub fn read_testdata(relative_path: &str) -> String {
    let path = workspace_testdata().join(relative_path);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// Write `data` into the virtual filesystem at `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write(path: &VfsPath, data: impl AsRef<[u8]>) -> eyre::Result<VfsPath> {
    let _ = path.parent().create_dir_all();
    let mut file = path.create_file()?;
    file.write_all(data.as_ref())?;
    Ok(path.clone())
}

/// Build a closed [`PathSet`] from rendered paths such as `.$.image.tag`.
///
/// # Panics
///
/// Panics if one of the paths is not in rendered form.
#[must_use]
pub fn path_set(paths: &[&str]) -> PathSet {
    paths
        .iter()
        .map(|raw| {
            raw.parse::<Path>()
                .unwrap_or_else(|e| panic!("invalid path {raw:?}: {e}"))
        })
        .collect()
}

pub type LogLevel = tracing::metadata::Level;

static INIT_EYRE: Once = Once::new();

#[derive(Default)]
pub struct TestGuard {
    _trace_guard: Option<tracing::subscriber::DefaultGuard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builder {
    setup_tracing: bool,
    install_eyre: bool,
    env_filter: Option<String>,
    log_level: LogLevel,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            setup_tracing: true,
            install_eyre: true,
            env_filter: None,
            log_level: LogLevel::DEBUG,
        }
    }
}

impl Builder {
    /// Initialize test.
    ///
    /// This ensures `color_eyre` is setup once and installs a thread local
    /// tracing subscriber that writes through the test harness. The
    /// subscriber stays active until the returned guard is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `color_eyre` installation fails.
    pub fn build(self) -> TestGuard {
        let mut test_guard = TestGuard::default();

        if self.install_eyre {
            INIT_EYRE.call_once(|| {
                color_eyre::install().expect("failed to install eyre");
            });
        }
        if self.setup_tracing {
            let filter = self
                .env_filter
                .clone()
                .or_else(|| std::env::var("RUST_LOG").ok())
                .unwrap_or_else(|| self.log_level.as_str().to_ascii_lowercase());
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .with_test_writer()
                .without_time()
                .compact()
                .finish();
            test_guard._trace_guard = Some(tracing::subscriber::set_default(subscriber));
        }

        test_guard
    }

    /// Toggle setting up tracing inside the test.
    #[must_use]
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.setup_tracing = enabled;
        self
    }

    /// Toggle log level for tracing inside the test.
    #[must_use]
    pub fn with_log_level(mut self, log_level: impl Into<LogLevel>) -> Self {
        self.log_level = log_level.into();
        self
    }

    /// Toggle installation of `color_eyre`.
    #[must_use]
    pub fn with_eyre(mut self, enabled: bool) -> Self {
        self.install_eyre = enabled;
        self
    }

    /// Configure the tracing subscribers env filter.
    ///
    /// Requires tracing to be enabled with `Self::with_tracing`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Create a new builder.
#[must_use]
pub fn builder() -> Builder {
    Builder::default()
}

pub mod matchers {
    use googletest::matchers::{ContainsMatcher, contains, predicate};
    use helmchk_core::PathSet;
    use vfs::VfsPath;

    /// Matches a list of virtual paths containing `path`.
    #[must_use]
    pub fn contains_vfs_path(
        path: &str,
    ) -> ContainsMatcher<impl googletest::matcher::Matcher<&VfsPath>> {
        contains(matches_vfs_path(path))
    }

    #[must_use]
    pub fn matches_vfs_path(path: &str) -> impl googletest::matcher::Matcher<&VfsPath> {
        predicate(move |p: &VfsPath| p.as_str() == path)
    }

    /// Matches a [`PathSet`] that has `path` (rendered form) as a member.
    #[must_use]
    pub fn has_value_path(path: &str) -> impl googletest::matcher::Matcher<&PathSet> {
        predicate(move |set: &PathSet| set.iter().any(|member| member.to_string() == path))
    }
}
