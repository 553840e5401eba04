//! Points-to propagation
//!
//! Pointers in one assign set may hold the same address, so the locations
//! they point to share one alias class. Conversely locations in one alias
//! class may hold the same value, so their contents share one assign set.
//! The two rules feed each other until neither partition changes.

use super::context::{AliasClass, Phase};
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::{Container, OffsetType, OstKey};
use crate::shared::models::{OstIdx, VstIdx};
use std::collections::BTreeSet;
use tracing::{debug, trace};

impl<'a> AliasClass<'a> {
    /// Pass 1 fixed point: Collected → Converged
    pub fn propagate(&mut self) -> AliasResult<()> {
        self.require("propagate", Phase::Collected)?;
        self.apply_aggregate_copies();
        self.union_overlapping_storage();

        let limit = self.config.max_pass1_rounds;
        let mut rounds = 0;
        loop {
            rounds += 1;
            if rounds > limit {
                return Err(AliasError::IterationLimit {
                    phase: "pass-1 convergence",
                    limit,
                });
            }
            let before = (self.ost_uf.count(), self.vst_uf.count());
            self.union_contents();
            self.apply_memory_copies();
            self.propagate_pointees()?;
            self.union_shifted_pointees();
            let nads_grew = self.consolidate_nads()?;
            let after = (self.ost_uf.count(), self.vst_uf.count());
            trace!(round = rounds, alias_classes = after.0, assign_sets = after.1, "pass-1 round");
            if before == after && !nads_grew {
                break;
            }
        }
        self.stats.pass1_rounds = rounds;

        if self.config.type_based_refinement {
            self.refine_by_type();
        }
        self.phase = Phase::Converged;
        debug!(
            function = self.env.name,
            rounds,
            alias_classes = self.ost_uf.count(),
            nads = self.stats.nads_count,
            "pass 1 converged"
        );
        Ok(())
    }

    /// Whole-aggregate copies: matching fields hold the same values
    fn apply_aggregate_copies(&mut self) {
        let copies = std::mem::take(&mut self.deferred_agg_copies);
        for &(lhs, rhs) in &copies {
            self.union_vsts(lhs, rhs);
            let (l, r) = (self.table.ost_of(lhs), self.table.ost_of(rhs));
            let count = self.env.types.field_count(self.table.ost(l).ty);
            for field_id in 1..=count {
                let lf = self.field_key(l, field_id).and_then(|k| self.table.lookup(&k));
                let rf = self.field_key(r, field_id).and_then(|k| self.table.lookup(&k));
                if let (Some(lf), Some(rf)) = (lf, rf) {
                    let (lv, rv) = (self.table.zero_version(lf), self.table.zero_version(rf));
                    self.union_vsts(lv, rv);
                }
            }
        }
        self.deferred_agg_copies = copies;
    }

    /// Key of field `field_id` (relative to `ost`'s type) of `ost`
    fn field_key(&self, ost: OstIdx, field_id: u32) -> Option<OstKey> {
        let o = self.table.ost(ost);
        let field = self.env.types.field(o.ty, field_id)?;
        Some(OstKey {
            base: o.base,
            indirect_lev: o.indirect_lev,
            field_id: o.field_id + field_id,
            offset: o.offset + OffsetType::from_bits(field.bit_offset),
            ty: field.ty,
            prev: o.prev_level,
        })
    }

    /// Members of one alias class may hold each other's values
    fn union_contents(&mut self) {
        for group in self.ost_uf.groups() {
            let mut contents = group
                .iter()
                .map(|&o| OstIdx(o))
                .filter(|&o| !self.table.ost(o).is_address_view())
                .map(|o| self.table.zero_version(o));
            let Some(first) = contents.next() else {
                continue;
            };
            let rest: Vec<VstIdx> = contents.collect();
            for vst in rest {
                self.union_vsts(first, vst);
            }
        }
    }

    /// memcpy-like intrinsics: destination and source memory hold the same values
    fn apply_memory_copies(&mut self) {
        let copies = self.memory_copies.clone();
        for (dst, src) in copies {
            let pointees: Vec<OstIdx> = self
                .group_pointees(dst)
                .into_iter()
                .chain(self.group_pointees(src))
                .collect();
            let mut versions = pointees.iter().map(|&p| self.table.zero_version(p));
            let Some(first) = versions.next() else {
                continue;
            };
            let rest: Vec<VstIdx> = versions.collect();
            for vst in rest {
                self.union_vsts(first, vst);
            }
        }
    }

    /// Worklist over assign sets: pointees of one set share an alias class
    fn propagate_pointees(&mut self) -> AliasResult<()> {
        let limit = self.config.max_propagation_steps;
        let mut worklist: Vec<u32> = self
            .vst_uf
            .roots()
            .into_iter()
            .filter(|&r| self.vst_uf.set_size(r) > 1)
            .collect();
        let mut steps = 0usize;
        while let Some(root) = worklist.pop() {
            steps += 1;
            if steps > limit {
                return Err(AliasError::IterationLimit {
                    phase: "points-to propagation",
                    limit,
                });
            }
            let pointees: Vec<OstIdx> = self
                .group_pointees(VstIdx(root))
                .into_iter()
                .filter(|&p| {
                    let o = self.table.ost(p);
                    o.indirect_lev >= 0 && !o.is_final
                })
                .collect();
            // compatibility is not transitive: a whole object must meet every field
            for (i, &a) in pointees.iter().enumerate() {
                for &b in &pointees[i + 1..] {
                    if !self.pointee_fields_compatible(a, b) || self.ost_uf.connected(a.0, b.0) {
                        continue;
                    }
                    if self.union_osts(a, b) {
                        let (va, vb) = (self.table.zero_version(a), self.table.zero_version(b));
                        if self.union_vsts(va, vb) {
                            worklist.push(self.vst_uf.root(va.0));
                        }
                    }
                }
            }
        }
        self.stats.propagation_steps += steps;
        Ok(())
    }

    /// Pointees reached through equal pointers overlap when either is the
    /// whole object or both name the same field
    fn pointee_fields_compatible(&self, a: OstIdx, b: OstIdx) -> bool {
        let (fa, fb) = (self.table.ost(a).field_id, self.table.ost(b).field_id);
        fa == 0 || fb == 0 || fa == fb
    }

    /// A pointer built by offsetting an address may reach any location
    /// sharing storage with its pointees
    fn union_shifted_pointees(&mut self) {
        if self.shifted_pointers.is_empty() {
            return;
        }
        let by_container = self.osts_by_container();
        let shifted: Vec<VstIdx> = self.shifted_pointers.iter().copied().collect();
        for vst in shifted {
            let pointees: Vec<OstIdx> = self
                .group_pointees(vst)
                .into_iter()
                .filter(|&p| !self.table.ost(p).is_final)
                .collect();
            let containers: BTreeSet<Container> = pointees
                .iter()
                .map(|&p| self.table.ost(p).container())
                .collect();
            for container in containers {
                let Some(siblings) = by_container.get(&container) else {
                    continue;
                };
                for &sibling in siblings {
                    if self.table.ost(sibling).is_final {
                        continue;
                    }
                    for &p in &pointees {
                        if self.ost_uf.connected(p.0, sibling.0) || self.union_osts(p, sibling) {
                            break;
                        }
                    }
                }
            }
        }
    }
}
