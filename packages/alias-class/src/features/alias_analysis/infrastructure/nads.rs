//! NADS ("not all defs seen") consolidation
//!
//! Every location whose writes are not all visible joins the alias class of
//! the NADS dummy, and every member of that class is flagged. Flags spread
//! downward: escaped pointers make their pointees NADS. Runs to a fixed
//! point, so a second run on the same state changes nothing.

use super::context::AliasClass;
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::OstBase;
use crate::shared::models::{OstIdx, VstIdx};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

impl<'a> AliasClass<'a> {
    /// Returns true when the NADS set grew
    pub fn consolidate_nads(&mut self) -> AliasResult<bool> {
        let dummy = self.nads_dummy();
        let before = self.nads_osts().len();
        let limit = self.config.max_pass1_rounds;
        let mut rounds = 0;
        loop {
            rounds += 1;
            if rounds > limit {
                return Err(AliasError::IterationLimit {
                    phase: "NADS consolidation",
                    limit,
                });
            }
            let mut changed = false;
            for seed in self.nads_seeds() {
                changed |= self.union_osts(dummy, seed);
            }
            for member in self.ost_uf.members(dummy.0) {
                changed |= self.mark_nads(OstIdx(member));
            }
            if !changed {
                break;
            }
        }
        let after = self.nads_osts().len();
        self.stats.nads_count = after;
        trace!(before, after, rounds, "NADS consolidated");
        Ok(after != before)
    }

    fn nads_seeds(&self) -> BTreeSet<OstIdx> {
        let mut seeds = BTreeSet::new();
        let eligible = |ost: OstIdx| {
            let o = self.table.ost(ost);
            o.indirect_lev >= 0 && !o.is_final && !o.is_nads_dummy()
        };

        for ost in self.table.ost_indices() {
            if eligible(ost) && self.is_nads(ost) {
                seeds.insert(ost);
            }
        }

        // pointees of every assign set holding an escaped location
        for group in self.vst_uf.groups() {
            let escaped = group.iter().any(|&v| {
                let flags = self.flags[self.table.ost_of(VstIdx(v)).0 as usize];
                flags.nads || flags.next_lev_nads
            });
            if escaped {
                let pointees = self.group_pointees(VstIdx(group[0]));
                seeds.extend(pointees.into_iter().filter(|&p| eligible(p)));
            }
        }

        // an opaque write through one pointer of a base may hit any field
        if self.config.mode.is_c() {
            let mut by_base: BTreeMap<OstBase, Vec<OstIdx>> = BTreeMap::new();
            for o in self.table.osts() {
                if o.indirect_lev == 1 && !o.is_final {
                    by_base.entry(o.base).or_default().push(o.index);
                }
            }
            for members in by_base.values() {
                if members.iter().any(|&m| self.is_nads(m) || seeds.contains(&m)) {
                    seeds.extend(members.iter().copied());
                }
            }
        }
        seeds
    }
}
