use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::app::{Vec3, DEFAULT_INTERACTION_RADIUS};
use crate::AppPaths;

use super::database::{NpcDef, QuestDef, VillageDatabase};

const DEFAULT_NPC_COLOR: [u8; 4] = [139, 69, 19, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
    UnknownReference,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} (file={}",
            self.code,
            self.message,
            self.file_path.display()
        )?;
        if let Some(loc) = self.location {
            write!(f, ", line={}, column={}", loc.line, loc.column)?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ContentCompileError {}

/// Compiles every `*.xml` file under the base content directory, visited in
/// relative-path order, into one database.
pub fn compile_village_database(
    app_paths: &AppPaths,
) -> Result<VillageDatabase, ContentCompileError> {
    let source_dir = &app_paths.base_content_dir;
    let xml_files = collect_xml_files_sorted(source_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut npcs = Vec::<NpcDef>::new();
    let mut quests = Vec::<QuestDef>::new();
    // Quest npc references are checked after every file is read.
    let mut npc_refs = Vec::<(String, String, PathBuf, Option<SourceLocation>)>::new();

    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        let parsed = parse_defs_document(xml_file, &raw)?;

        for def in parsed.npcs {
            if npcs.iter().any(|existing| existing.name == def.value.name) {
                return Err(duplicate_def("NpcDef", &def.value.name, xml_file, def.location));
            }
            npcs.push(def.value);
        }
        for def in parsed.quests {
            if quests.iter().any(|existing| existing.id == def.value.id) {
                return Err(duplicate_def("QuestDef", &def.value.id, xml_file, def.location));
            }
            if let Some(npc) = &def.value.npc {
                npc_refs.push((def.value.id.clone(), npc.clone(), xml_file.clone(), def.location));
            }
            quests.push(def.value);
        }
    }

    for (quest_id, npc, file_path, location) in npc_refs {
        if !npcs.iter().any(|def| def.name == npc) {
            return Err(ContentCompileError {
                code: ContentErrorCode::UnknownReference,
                message: format!("QuestDef '{quest_id}' references unknown NpcDef '{npc}'"),
                file_path,
                location,
            });
        }
    }

    info!(
        source_dir = %source_dir.display(),
        xml_files = xml_files.len(),
        npc_count = npcs.len(),
        quest_count = quests.len(),
        "content_compiled"
    );
    Ok(VillageDatabase::new(npcs, quests))
}

struct Located<T> {
    value: T,
    location: Option<SourceLocation>,
}

#[derive(Default)]
struct ParsedDefs {
    npcs: Vec<Located<NpcDef>>,
    quests: Vec<Located<QuestDef>>,
}

fn parse_defs_document(file_path: &Path, raw: &str) -> Result<ParsedDefs, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut parsed = ParsedDefs::default();
    for child in root.children().filter(|node| node.is_element()) {
        let location = Some(location_of(&doc, child));
        match child.tag_name().name() {
            "NpcDef" => parsed.npcs.push(Located {
                value: parse_npc_def(file_path, &doc, child)?,
                location,
            }),
            "QuestDef" => parsed.quests.push(Located {
                value: parse_quest_def(file_path, &doc, child)?,
                location,
            }),
            other => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownDefType,
                    format!("unsupported def type <{other}>; expected <NpcDef> or <QuestDef>"),
                    file_path,
                    &doc,
                    child,
                ))
            }
        }
    }
    Ok(parsed)
}

/// Walks the element children of a def, rejecting repeated field names.
fn for_each_field<'a, 'input>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'a, 'input>,
    def_type: &str,
    mut visit: impl FnMut(&str, Node<'a, 'input>) -> Result<(), ContentCompileError>,
) -> Result<(), ContentCompileError> {
    let mut seen_fields = HashSet::<&str>::new();
    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        if !seen_fields.insert(field_name) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <{def_type}>"),
                file_path,
                doc,
                field,
            ));
        }
        visit(field_name, field)?;
    }
    Ok(())
}

fn parse_npc_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<NpcDef, ContentCompileError> {
    let mut name: Option<String> = None;
    let mut position: Option<Vec3> = None;
    let mut interact_radius: Option<f32> = None;
    let mut color: Option<[u8; 4]> = None;

    for_each_field(file_path, doc, node, "NpcDef", |field_name, field| {
        match field_name {
            "name" => name = Some(required_text(file_path, doc, field, "name")?),
            "position" => {
                let value = required_text(file_path, doc, field, "position")?;
                position = Some(parse_position(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("position '{value}' must be three finite numbers 'x,y,z'"),
                        file_path,
                        doc,
                        field,
                    )
                })?);
            }
            "interactRadius" => {
                let value = required_text(file_path, doc, field, "interactRadius")?;
                let parsed = value
                    .parse::<f32>()
                    .ok()
                    .filter(|radius| radius.is_finite() && *radius > 0.0)
                    .ok_or_else(|| {
                        error_at_node(
                            ContentErrorCode::InvalidValue,
                            format!("interactRadius '{value}' must be a finite number > 0"),
                            file_path,
                            doc,
                            field,
                        )
                    })?;
                interact_radius = Some(parsed);
            }
            "color" => {
                let value = required_text(file_path, doc, field, "color")?;
                color = Some(parse_color(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("color '{value}' must be '#rrggbb'"),
                        file_path,
                        doc,
                        field,
                    )
                })?);
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <NpcDef>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| missing_field("name", "NpcDef", file_path, doc, node))?;
    let position =
        position.ok_or_else(|| missing_field("position", "NpcDef", file_path, doc, node))?;
    Ok(NpcDef {
        name,
        position,
        interact_radius: interact_radius.unwrap_or(DEFAULT_INTERACTION_RADIUS),
        color: color.unwrap_or(DEFAULT_NPC_COLOR),
    })
}

fn parse_quest_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<QuestDef, ContentCompileError> {
    let mut id: Option<String> = None;
    let mut title: Option<String> = None;
    let mut objective: Option<String> = None;
    let mut npc: Option<String> = None;
    let mut reward_xp: Option<u32> = None;

    for_each_field(file_path, doc, node, "QuestDef", |field_name, field| {
        match field_name {
            "id" => id = Some(required_text(file_path, doc, field, "id")?),
            "title" => title = Some(required_text(file_path, doc, field, "title")?),
            "objective" => objective = Some(required_text(file_path, doc, field, "objective")?),
            "npc" => npc = Some(required_text(file_path, doc, field, "npc")?),
            "rewardXp" => {
                let value = required_text(file_path, doc, field, "rewardXp")?;
                reward_xp = Some(value.parse::<u32>().map_err(|_| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("rewardXp '{value}' is not a non-negative integer"),
                        file_path,
                        doc,
                        field,
                    )
                })?);
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <QuestDef>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
        Ok(())
    })?;

    let id = id.ok_or_else(|| missing_field("id", "QuestDef", file_path, doc, node))?;
    let title = title.ok_or_else(|| missing_field("title", "QuestDef", file_path, doc, node))?;
    let objective =
        objective.ok_or_else(|| missing_field("objective", "QuestDef", file_path, doc, node))?;
    Ok(QuestDef {
        id,
        title,
        objective,
        npc,
        reward_xp: reward_xp.unwrap_or(0),
    })
}

fn parse_position(value: &str) -> Option<Vec3> {
    let mut parts = value.split(',').map(|part| part.trim().parse::<f32>());
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    let position = Vec3::new(x, y, z);
    position.is_finite().then_some(position)
}

fn parse_color(value: &str) -> Option<[u8; 4]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255])
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    field_name: &str,
    def_type: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    error_at_node(
        ContentErrorCode::MissingField,
        format!("missing required field <{field_name}> in <{def_type}>"),
        file_path,
        doc,
        node,
    )
}

fn duplicate_def(
    def_type: &str,
    key: &str,
    file_path: &Path,
    location: Option<SourceLocation>,
) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::DuplicateDef,
        message: format!("duplicate {def_type} '{key}'"),
        file_path: file_path.to_path_buf(),
        location,
    }
}

fn location_of(doc: &Document<'_>, node: Node<'_, '_>) -> SourceLocation {
    let pos = doc.text_pos_at(node.range().start);
    SourceLocation {
        line: pos.row as usize,
        column: pos.col as usize,
    }
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(location_of(doc, node)),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            files.push((normalize_rel_path(relative), path));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        file_path: path,
        location: None,
    }
}
