use std::collections::{BTreeMap, HashMap};

use esx_core::project::{AccessPoint, Collection, Note};
use esx_io::{DocumentKind, IoError, Requirements, serialize_collection};

use crate::index::ProjectIndex;
use crate::matching::TelecomRoomPolicy;
use crate::writeback;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// 回写命令产生的新文档，尚未写入归档。
#[derive(Debug, Clone, Default)]
pub struct WriteBack {
    pub access_points: Option<Collection<AccessPoint>>,
    pub notes: Option<Collection<Note>>,
}

impl WriteBack {
    pub fn is_empty(&self) -> bool {
        self.access_points.is_none() && self.notes.is_none()
    }

    /// 归档条目名 → 序列化后的文档内容。
    pub fn replacements(&self) -> Result<BTreeMap<String, Vec<u8>>, IoError> {
        let mut replacements = BTreeMap::new();
        if let Some(access_points) = &self.access_points {
            let kind = DocumentKind::AccessPoints;
            replacements.insert(
                kind.file_name().to_string(),
                serialize_collection(kind, access_points)?,
            );
        }
        if let Some(notes) = &self.notes {
            let kind = DocumentKind::Notes;
            replacements.insert(kind.file_name().to_string(), serialize_collection(kind, notes)?);
        }
        Ok(replacements)
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// 命令执行前必须加载的文档。
    fn requirements(&self) -> Requirements;

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_, '_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a, 'p> {
    pub index: &'a ProjectIndex<'p>,
    pub room_policy: &'a TelecomRoomPolicy,
    pub output: &'a mut WriteBack,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(TagAntennaCommand);
        bus.register(UpdateModelCommand);
        bus.register(RenameCableNotesCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn requirements_for(&self, name: &str) -> Option<Requirements> {
        self.handlers.get(name).map(|handler| handler.requirements())
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_, '_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

struct TagAntennaCommand;

impl CommandHandler for TagAntennaCommand {
    fn name(&self) -> &'static str {
        "tag-antenna"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new([
            DocumentKind::AccessPoints,
            DocumentKind::FloorPlans,
            DocumentKind::SimulatedRadios,
            DocumentKind::AntennaTypes,
            DocumentKind::TagKeys,
        ])
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_, '_>,
    ) -> CommandResponse {
        match writeback::tag_antennas(context.index) {
            Ok(result) => {
                context.output.access_points = Some(result.document);
                CommandResponse::ok(format!("已更新 {} 个 AP 的天线标签", result.changed))
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct UpdateModelCommand;

impl CommandHandler for UpdateModelCommand {
    fn name(&self) -> &'static str {
        "update-model"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new([
            DocumentKind::AccessPoints,
            DocumentKind::FloorPlans,
            DocumentKind::SimulatedRadios,
            DocumentKind::AntennaTypes,
        ])
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_, '_>,
    ) -> CommandResponse {
        let result = writeback::splice_antenna_models(context.index);
        context.output.access_points = Some(result.document);
        CommandResponse::ok(format!("已更新 {} 个 AP 的型号", result.changed))
    }
}

struct RenameCableNotesCommand;

impl CommandHandler for RenameCableNotesCommand {
    fn name(&self) -> &'static str {
        "rename-cable-notes"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new([
            DocumentKind::AccessPoints,
            DocumentKind::FloorPlans,
            DocumentKind::Notes,
            DocumentKind::CableNotes,
            DocumentKind::PictureNotes,
        ])
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_, '_>,
    ) -> CommandResponse {
        match writeback::rename_cable_notes(context.index, context.room_policy) {
            Ok(result) => {
                context.output.notes = Some(result.document);
                CommandResponse::ok(format!("已重命名 {} 条线缆备注", result.changed))
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_project;
    use serde_json::Value;

    #[test]
    fn write_back_commands_fill_output_documents() {
        let project = sample_project();
        let index = ProjectIndex::build(&project).unwrap();
        let policy = TelecomRoomPolicy::default();
        let mut output = WriteBack::default();
        let bus = CommandBus::new();

        let mut context = CommandContext {
            index: &index,
            room_policy: &policy,
            output: &mut output,
        };
        let response = bus.dispatch(&CommandRequest::new("rename-cable-notes"), &mut context);
        assert!(response.success, "{:?}", response.message);
        let response = bus.dispatch(&CommandRequest::new("update-model"), &mut context);
        assert!(response.success);

        assert!(!output.is_empty());
        let replacements = output.replacements().expect("序列化回写文档失败");
        assert_eq!(
            replacements.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["accessPoints.json", "notes.json"]
        );
        let notes: Value = serde_json::from_slice(&replacements["notes.json"]).unwrap();
        assert_eq!(notes["notes"][2]["text"], "From IDF-1 to AP-02");
    }

    #[test]
    fn failing_command_reports_error() {
        let mut project = sample_project();
        project.tag_keys.items.clear();
        let index = ProjectIndex::build(&project).unwrap();
        let policy = TelecomRoomPolicy::default();
        let mut output = WriteBack::default();
        let mut context = CommandContext {
            index: &index,
            room_policy: &policy,
            output: &mut output,
        };
        let response = CommandBus::new().dispatch(&CommandRequest::new("tag-antenna"), &mut context);
        assert!(!response.success);
        assert!(response.message.unwrap().contains("antenna-name"));
        assert!(output.is_empty());
    }

    #[test]
    fn unknown_command_is_rejected() {
        let bus = CommandBus::new();
        assert!(bus.requirements_for("grid").is_none());
        assert!(
            bus.requirements_for("tag-antenna")
                .unwrap()
                .requires(DocumentKind::TagKeys)
        );
        let mut names: Vec<&str> = bus.available_commands().copied().collect();
        names.sort();
        assert_eq!(names, vec!["rename-cable-notes", "tag-antenna", "update-model"]);
    }
}
