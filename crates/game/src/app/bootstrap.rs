use engine::{
    compile_village_database, resolve_app_paths, AppError, FileSaveStore, LoopConfig, Scene,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, DialogueLibrary, DIALOGUE_FILE_NAME};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "startup");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "app_paths_resolved");

    let catalog = compile_village_database(&paths)?;
    let dialogue = DialogueLibrary::spawn_load(paths.data_dir.join(DIALOGUE_FILE_NAME));
    let store = FileSaveStore::new(&paths.saves_dir);
    info!(saves_dir = %store.dir().display(), "save_store_ready");

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: gameplay::build_village_scene(catalog, dialogue, Box::new(store)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
