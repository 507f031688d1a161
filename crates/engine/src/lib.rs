use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod persistence;

pub use app::{
    run_app, AppError, Camera3D, Entity, EntityId, InputAction, InputSnapshot, Interactable,
    LoopConfig, OrbitRig, PickingService, Ray, RayHit, RaycastScene, RenderableKind, Scene,
    SceneCommand, SceneOverlay, SceneWorld, Transform, Vec2, Vec3, Viewport,
    DEFAULT_INTERACTION_RADIUS, DEFAULT_MAX_PICK_DISTANCE, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    compile_village_database, ContentCompileError, ContentErrorCode, NpcDef, QuestDef,
    SourceLocation, VillageDatabase,
};
pub use persistence::{FileSaveStore, MemorySaveStore, SaveStore, SaveStoreError};

pub const ROOT_ENV_VAR: &str = "KOKURA_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    /// Standard layout below `root`; does not touch the filesystem.
    pub fn under_root(root: &Path) -> Self {
        let assets = root.join("assets");
        let cache_dir = root.join("cache");
        Self {
            root: root.to_path_buf(),
            base_content_dir: assets.join("base"),
            data_dir: assets.join("data"),
            saves_dir: cache_dir.join("saves"),
            cache_dir,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/kokura\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = AppPaths::under_root(&root);

    fs::create_dir_all(&paths.cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: paths.cache_dir.clone(),
        source,
    })?;

    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("cargo");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_a_nested_directory() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("crates")).expect("crates");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("cargo");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(temp.path()));
    }

    #[test]
    fn layout_under_root_places_saves_in_cache() {
        let paths = AppPaths::under_root(Path::new("/village"));
        assert_eq!(paths.base_content_dir, Path::new("/village/assets/base"));
        assert_eq!(paths.data_dir, Path::new("/village/assets/data"));
        assert_eq!(paths.saves_dir, Path::new("/village/cache/saves"));
    }
}
