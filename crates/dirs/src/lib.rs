use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name of the environment variable overriding the grip home directory.
pub const GRIPHOME_ENV: &str = "GRIPHOME";

pub struct Dirs;

impl Dirs {
    /// Project directory specifically for grip.
    ///
    /// Used as the fallback home when neither `$GRIPHOME` nor `~/.grip` exists.
    pub fn project() -> &'static ProjectDirs {
        static CELL: OnceLock<ProjectDirs> = OnceLock::new();

        CELL.get_or_init(|| {
            ProjectDirs::from("org", "grip", "grip")
                .expect("Couldn't create project directory for grip")
        })
    }

    /// Provides access to the standard directories that the operating system uses.
    pub fn base() -> &'static BaseDirs {
        static CELL: OnceLock<BaseDirs> = OnceLock::new();

        CELL.get_or_init(|| BaseDirs::new().expect("Failed to construct BaseDirs"))
    }

    /// Home directory holding `settings.toml` and the asset cache.
    ///
    /// Resolution order:
    /// 1. `$GRIPHOME`
    /// 2. `~/.grip` if it exists
    /// 3. the platform config dir, e.g. `~/.config/grip` on Linux
    pub fn grip_home() -> PathBuf {
        let env_home = std::env::var_os(GRIPHOME_ENV).map(PathBuf::from);
        resolve_grip_home(
            env_home,
            Self::base().home_dir(),
            Self::project().config_dir(),
        )
    }

    /// Default cache directory, `<grip home>/cache-<version>`.
    ///
    /// The directory is not created here, the asset manager creates it lazily.
    pub fn default_cache_dir(cache_directory: &str, version: &str) -> PathBuf {
        Self::grip_home().join(cache_directory.replace("{version}", version))
    }
}

fn resolve_grip_home(env_home: Option<PathBuf>, home_dir: &Path, config_dir: &Path) -> PathBuf {
    if let Some(home) = env_home.filter(|p| !p.as_os_str().is_empty()) {
        return home;
    }

    let dot_grip = home_dir.join(".grip");
    if dot_grip.exists() {
        return dot_grip;
    }

    config_dir.to_path_buf()
}
