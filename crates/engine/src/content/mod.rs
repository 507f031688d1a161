mod compiler;
mod database;

pub use compiler::{
    compile_village_database, ContentCompileError, ContentErrorCode, SourceLocation,
};
pub use database::{NpcDef, QuestDef, VillageDatabase};
