pub mod command;
pub mod index;
pub mod matching;
pub mod photos;
pub mod pipeline;
pub mod writeback;

#[cfg(test)]
mod testing;

pub mod errors {
    use esx_core::project::{EntityId, EntityKind};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("tag key `{0}` is not configured in this project")]
        UnknownTagKey(String),
        #[error("no eligible {kind} candidates for {subject} on floor plan {floor_plan_id}")]
        NoCandidates {
            kind: EntityKind,
            subject: String,
            floor_plan_id: EntityId,
        },
        #[error("{referrer} references missing {kind} {id}")]
        UnresolvedReference {
            kind: EntityKind,
            id: EntityId,
            referrer: String,
        },
        #[error("duplicate {kind} id {id}")]
        DuplicateId { kind: EntityKind, id: EntityId },
        #[error("floor plan `{name}` ({id}) has a non-positive scale {scale}")]
        InvalidScale { id: EntityId, name: String, scale: f64 },
    }

    impl EngineError {
        pub fn unresolved(kind: EntityKind, id: &EntityId, referrer: impl Into<String>) -> Self {
            Self::UnresolvedReference {
                kind,
                id: id.clone(),
                referrer: referrer.into(),
            }
        }

        /// 仅影响单个实体、不应中断整个运行的错误。
        #[inline]
        pub fn is_per_entity(&self) -> bool {
            matches!(self, Self::NoCandidates { .. })
        }
    }
}
