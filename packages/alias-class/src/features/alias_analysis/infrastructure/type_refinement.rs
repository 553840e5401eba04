//! Type-based refinement of converged alias classes
//!
//! Each class is split into sub-classes of mutually compatible types:
//! accesses of incompatible types are assumed not to overlap.

use super::context::AliasClass;
use crate::config::LanguageMode;
use crate::shared::models::{OstIdx, PrimType};
use tracing::debug;

impl<'a> AliasClass<'a> {
    pub(crate) fn refine_by_type(&mut self) {
        let groups = self.ost_uf.groups();
        let before = groups.len();
        self.ost_uf.reinit();
        for (idx, flags) in self.flags.iter().enumerate() {
            self.group_nads[idx] = flags.nads;
        }

        for group in groups {
            let mut representatives: Vec<OstIdx> = Vec::new();
            for member in group.into_iter().map(OstIdx) {
                let mut placed = false;
                for &rep in &representatives {
                    if self.types_compatible(rep, member)
                        && (self.ost_uf.connected(rep.0, member.0) || self.union_osts(rep, member))
                    {
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    representatives.push(member);
                }
            }
        }
        debug!(before, after = self.ost_uf.count(), "type-based refinement");
    }

    pub(crate) fn types_compatible(&self, a: OstIdx, b: OstIdx) -> bool {
        let (oa, ob) = (self.table.ost(a), self.table.ost(b));
        if oa.is_nads_dummy() || ob.is_nads_dummy() {
            return true;
        }
        let object_oriented = self.config.mode == LanguageMode::ObjectOriented;
        if object_oriented && oa.field_id != ob.field_id {
            return false;
        }
        if oa.ty == ob.ty {
            return true;
        }
        let types = self.env.types;
        let (pa, pb) = (types.prim_of(oa.ty), types.prim_of(ob.ty));
        if pa == PrimType::Void || pb == PrimType::Void || pa.is_char() || pb.is_char() {
            return true;
        }
        if pa != PrimType::Agg && pa == pb {
            return true;
        }
        if pa.is_address() && pb.is_address() {
            return true;
        }
        if types.contains_type(oa.ty, ob.ty) || types.contains_type(ob.ty, oa.ty) {
            return true;
        }
        object_oriented
            && (self.hierarchy.is_super_class(oa.ty, ob.ty) || self.hierarchy.is_super_class(ob.ty, oa.ty))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AliasConfig;
    use crate::features::alias_analysis::infrastructure::context::AliasClass;
    use crate::features::alias_analysis::ports::NoSummaries;
    use crate::shared::models::{
        Expr, FuncId, FunctionBuilder, PrimType, TypeTable,
    };

    #[test]
    fn test_refinement_splits_incompatible_pointees() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let f64_ty = types.prim(PrimType::F64);
        let i8_ty = types.prim(PrimType::I8);
        let raw = types.prim(PrimType::Ptr);
        let int_ptr = types.pointer_to(i32_ty);
        let dbl_ptr = types.pointer_to(f64_ty);
        let chr_ptr = types.pointer_to(i8_ty);

        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let p = b.local("p", raw);
        let q = b.local("q", raw);
        let i = b.local("i", i32_ty);
        let d = b.local("d", f64_ty);
        let c = b.local("c", i8_ty);
        b.dassign(q, Expr::dread(p, PrimType::Ptr));
        b.dassign(i, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(p, PrimType::Ptr)));
        b.dassign(d, Expr::iread(dbl_ptr, 0, PrimType::F64, Expr::dread(q, PrimType::Ptr)));
        b.dassign(c, Expr::iread(chr_ptr, 0, PrimType::I8, Expr::dread(q, PrimType::Ptr)));
        let mut func = b.build();

        let (env, blocks) = func.split(&types, &[]);
        let plain = AliasConfig::default();
        let mut ac = AliasClass::new(env, &plain, &NoSummaries, &types);
        ac.collect(blocks).unwrap();
        ac.propagate().unwrap();
        let po = ac.symbol_ost(p, 0).unwrap().unwrap();
        let qo = ac.symbol_ost(q, 0).unwrap().unwrap();
        let (pi, qd, qc) = (
            ac.table.next_level(po)[0],
            ac.table.next_level(qo)[0],
            ac.table.next_level(qo)[1],
        );
        assert!(ac.ost_uf.connected(pi.0, qd.0));

        let refined = AliasConfig::default().type_based_refinement(true);
        let mut func2 = func.clone();
        let (env, blocks) = func2.split(&types, &[]);
        let mut ac = AliasClass::new(env, &refined, &NoSummaries, &types);
        ac.collect(blocks).unwrap();
        ac.propagate().unwrap();
        assert!(!ac.ost_uf.connected(pi.0, qd.0));
        // character accesses may alias anything
        assert!(ac.types_compatible(pi, qc));
        assert!(ac.types_compatible(qd, qc));
    }
}
