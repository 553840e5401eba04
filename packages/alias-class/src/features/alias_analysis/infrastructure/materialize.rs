//! Alias-set materialization
//!
//! Freezes both converged partitions into shared sets (one set per
//! non-singleton class, referenced by every member) together with the final
//! NADS set. Pass 2 and every query read only the frozen form.

use super::context::{AliasClass, Phase};
use super::descriptor_table::DescriptorTable;
use crate::errors::AliasResult;
use crate::features::alias_analysis::domain::SharedSets;
use crate::shared::models::{OstIdx, VstIdx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrozenClasses {
    pub alias_sets: SharedSets<OstIdx>,
    pub assign_sets: SharedSets<VstIdx>,
    pub nads: BTreeSet<OstIdx>,
    /// Classes were split by type; NADS membership alone no longer implies overlap
    pub refined: bool,
}

impl FrozenClasses {
    pub fn may_alias(&self, table: &DescriptorTable, a: OstIdx, b: OstIdx) -> bool {
        let (oa, ob) = (table.ost(a), table.ost(b));
        if a == b {
            return oa.indirect_lev >= 0;
        }
        if oa.is_address_view() || ob.is_address_view() || oa.is_final || ob.is_final {
            return false;
        }
        if oa.known_disjoint(ob) {
            return false;
        }
        if self.alias_sets.same_set(a, b) {
            return true;
        }
        !self.refined && self.nads.contains(&a) && self.nads.contains(&b)
    }

    /// Alias-set members of `ost`, itself included
    pub fn alias_members(&self, ost: OstIdx) -> Vec<OstIdx> {
        self.alias_sets.members(ost)
    }

    pub fn is_nads(&self, ost: OstIdx) -> bool {
        self.nads.contains(&ost)
    }
}

impl<'a> AliasClass<'a> {
    /// Converged → Materialized
    pub fn materialize(&mut self) -> AliasResult<()> {
        self.require("materialize", Phase::Converged)?;
        let alias_groups = self
            .ost_uf
            .groups()
            .into_iter()
            .map(|g| g.into_iter().map(OstIdx).collect::<Vec<_>>());
        let assign_groups = self
            .vst_uf
            .groups()
            .into_iter()
            .map(|g| g.into_iter().map(VstIdx).collect::<Vec<_>>());
        self.classes = FrozenClasses {
            alias_sets: SharedSets::from_groups(self.table.num_osts(), alias_groups),
            assign_sets: SharedSets::from_groups(self.table.num_vsts(), assign_groups),
            nads: self.nads_osts(),
            refined: self.config.type_based_refinement,
        };
        self.stats.nads_count = self.classes.nads.len();

        for set in self.classes.alias_sets.sets() {
            let names: Vec<&str> = set.iter().map(|&o| self.table.ost(o).name.as_str()).collect();
            trace!(members = ?names, "alias set");
        }
        debug!(
            function = self.env.name,
            alias_sets = self.classes.alias_sets.len(),
            assign_sets = self.classes.assign_sets.len(),
            nads = self.classes.nads.len(),
            "alias sets materialized"
        );
        self.phase = Phase::Materialized;
        Ok(())
    }

    pub fn classes(&self) -> &FrozenClasses {
        &self.classes
    }

    /// May-alias query over the frozen classes
    pub fn may_alias(&self, a: OstIdx, b: OstIdx) -> AliasResult<bool> {
        if self.phase < Phase::Materialized {
            return Err(crate::errors::AliasError::PhaseOrder {
                operation: "may_alias",
                required: Phase::Materialized.as_str(),
                current: self.phase.as_str(),
            });
        }
        self.table.get_ost(a)?;
        self.table.get_ost(b)?;
        Ok(self.classes.may_alias(&self.table, a, b))
    }
}
