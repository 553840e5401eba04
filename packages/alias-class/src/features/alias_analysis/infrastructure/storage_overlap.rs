//! Unions between locations laid out in the same storage
//!
//! Locations with one container (fields of one symbol, or locations reached
//! through one pointer) overlap unless their bit ranges are known to be
//! disjoint. A whole aggregate therefore joins every one of its fields.

use super::context::AliasClass;
use crate::features::alias_analysis::domain::{ranges_disjoint, Container};
use crate::shared::models::OstIdx;
use std::collections::BTreeMap;

impl<'a> AliasClass<'a> {
    /// Tracked locations grouped by container, ascending within each group
    pub(crate) fn osts_by_container(&self) -> BTreeMap<Container, Vec<OstIdx>> {
        let mut by_container: BTreeMap<Container, Vec<OstIdx>> = BTreeMap::new();
        for ost in self.table.osts() {
            if ost.is_address_view() || ost.is_nads_dummy() {
                continue;
            }
            by_container.entry(ost.container()).or_default().push(ost.index);
        }
        by_container
    }

    pub(crate) fn union_overlapping_storage(&mut self) {
        let types = self.env.types;
        let c_mode = self.config.mode.is_c();
        for members in self.osts_by_container().into_values() {
            if members.len() < 2 {
                continue;
            }
            // in C every field of a union, a reinterpreted or a nested
            // aggregate may be reached from any other
            let union_all = c_mode
                && members.iter().any(|&m| {
                    let o = self.table.ost(m);
                    types.is_union(o.ty)
                        || o.offset.is_invalid()
                        || (o.field_id != 0 && types.has_subfields(o.ty))
                });
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let (oa, ob) = (self.table.ost(a), self.table.ost(b));
                    if union_all || !ranges_disjoint(oa.offset, oa.bit_size, ob.offset, ob.bit_size) {
                        self.union_osts(a, b);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AliasConfig;
    use crate::features::alias_analysis::infrastructure::context::AliasClass;
    use crate::features::alias_analysis::ports::NoSummaries;
    use crate::shared::models::{
        AggKind, FieldDecl, FuncId, Function, MirType, PrimType, StorageClass, Symbol, SymbolId,
        TypeTable,
    };

    #[test]
    fn test_aggregate_joins_fields_but_fields_stay_apart() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let pair = types.add(MirType::Aggregate {
            name: "Pair".into(),
            agg: AggKind::Struct,
            fields: vec![FieldDecl::new("x", i32_ty), FieldDecl::new("y", i32_ty)],
            parent: None,
        });
        let mut func = Function::new(FuncId(0), "f");
        func.locals.push(Symbol::new("s", pair, StorageClass::Local));
        let config = AliasConfig::default();
        let (env, _) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);

        let s = SymbolId::Local(0);
        let whole = ac.symbol_ost(s, 0).unwrap().unwrap();
        let x = ac.symbol_ost(s, 1).unwrap().unwrap();
        let y = ac.symbol_ost(s, 2).unwrap().unwrap();
        ac.union_overlapping_storage();

        assert!(ac.ost_uf.connected(whole.0, x.0));
        assert!(ac.ost_uf.connected(whole.0, y.0));
        // joined through the aggregate, yet still known disjoint
        assert!(ac.table.ost(x).known_disjoint(ac.table.ost(y)));
        assert!(ac.stats.refused_unions >= 1);
    }
}
