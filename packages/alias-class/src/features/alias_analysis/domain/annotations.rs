//! May-def / may-use annotations attached to statements

use crate::shared::models::{OstIdx, StmtId, VstIdx};
use serde::{Deserialize, Serialize};

/// Statement may write the location (zero version of `ost`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MayDefNode {
    pub ost: OstIdx,
    pub opnd: VstIdx,
    pub stmt: StmtId,
}

/// Statement may read the location (zero version of `ost`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MayUseNode {
    pub ost: OstIdx,
    pub opnd: VstIdx,
}

/// Annotation container owned by one statement; entries sorted by location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StmtAnnotations {
    pub may_defs: Vec<MayDefNode>,
    pub may_uses: Vec<MayUseNode>,
}

impl StmtAnnotations {
    pub fn insert_may_def(&mut self, node: MayDefNode) {
        if let Err(pos) = self.may_defs.binary_search_by_key(&node.ost, |n| n.ost) {
            self.may_defs.insert(pos, node);
        }
    }

    pub fn insert_may_use(&mut self, node: MayUseNode) {
        if let Err(pos) = self.may_uses.binary_search_by_key(&node.ost, |n| n.ost) {
            self.may_uses.insert(pos, node);
        }
    }

    pub fn defines(&self, ost: OstIdx) -> bool {
        self.may_defs.binary_search_by_key(&ost, |n| n.ost).is_ok()
    }

    pub fn uses(&self, ost: OstIdx) -> bool {
        self.may_uses.binary_search_by_key(&ost, |n| n.ost).is_ok()
    }

    pub fn may_def_osts(&self) -> impl Iterator<Item = OstIdx> + '_ {
        self.may_defs.iter().map(|n| n.ost)
    }

    pub fn may_use_osts(&self) -> impl Iterator<Item = OstIdx> + '_ {
        self.may_uses.iter().map(|n| n.ost)
    }

    pub fn is_empty(&self) -> bool {
        self.may_defs.is_empty() && self.may_uses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_dedups_and_sorts() {
        let mut ann = StmtAnnotations::default();
        for ost in [3, 1, 3, 2] {
            ann.insert_may_use(MayUseNode {
                ost: OstIdx(ost),
                opnd: VstIdx(ost),
            });
        }
        let osts: Vec<u32> = ann.may_use_osts().map(|o| o.0).collect();
        assert_eq!(osts, vec![1, 2, 3]);
        assert!(ann.uses(OstIdx(2)));
        assert!(!ann.defines(OstIdx(2)));
    }
}
