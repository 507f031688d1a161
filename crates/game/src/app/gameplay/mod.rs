mod avatar;
mod dialogue;
mod interaction;
mod proximity;
mod quest;
mod save;
mod scene_impl;
mod state;
mod ui;

use engine::{Scene, SaveStore, VillageDatabase};

pub(crate) use dialogue::{DialogueLibrary, DIALOGUE_FILE_NAME};

use save::GameStateStore;
use scene_impl::VillageScene;

pub(crate) fn build_village_scene(
    catalog: VillageDatabase,
    dialogue: DialogueLibrary,
    store: Box<dyn SaveStore>,
) -> Box<dyn Scene> {
    Box::new(VillageScene::new(
        catalog,
        dialogue,
        GameStateStore::new(store),
    ))
}
