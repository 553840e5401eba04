//! Result of resolving an expression to a storage location

use super::offset::OffsetType;
use crate::shared::models::VstIdx;

/// Location an expression evaluates to (or reads), plus the field and bit
/// offset accumulated on the way. `vst` is `None` when the expression does
/// not resolve to any tracked location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasInfo {
    pub vst: Option<VstIdx>,
    pub field_id: u32,
    pub offset: OffsetType,
}

impl AliasInfo {
    pub const NONE: AliasInfo = AliasInfo {
        vst: None,
        field_id: 0,
        offset: OffsetType::ZERO,
    };

    pub fn of(vst: VstIdx) -> Self {
        Self {
            vst: Some(vst),
            field_id: 0,
            offset: OffsetType::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: OffsetType) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_field(mut self, field_id: u32) -> Self {
        self.field_id = field_id;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.vst.is_some()
    }
}
