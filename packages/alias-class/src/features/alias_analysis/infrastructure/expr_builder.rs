//! Expression alias-info builder
//!
//! Resolves an expression tree to the location it evaluates to (or reads)
//! plus the field and bit offset accumulated along the way. Operands are
//! always visited, even when the expression itself resolves to nothing, so
//! escapes registered by sub-expressions are never lost.

use super::context::AliasClass;
use super::descriptor_table::OstAttrs;
use super::intrinsics::{describe, ExprEffect};
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::{AliasInfo, OffsetType, OstKey};
use crate::shared::models::{
    BinaryOp, Expr, FieldInfo, Intrinsic, IreadNode, MirType, OstIdx, PrimType, RegRef, TyIdx,
    VarRef,
};

/// Alias-relevant shape of an expression node
enum ExprShape<'e> {
    Address(&'e VarRef),
    FieldAddress { field_id: u32, base: &'e Expr },
    DirectVar(&'e VarRef),
    DirectReg(&'e RegRef),
    IndirectAccess(&'e IreadNode),
    Arithmetic { op: BinaryOp, lhs: &'e Expr, rhs: &'e Expr },
    ArrayElement { ptr_ty: TyIdx, base: &'e Expr, indices: &'e [Expr] },
    Cast(&'e Expr),
    Select { cond: &'e Expr, then_expr: &'e Expr, else_expr: &'e Expr },
    Intrinsic { intrinsic: Intrinsic, opnds: &'e [Expr] },
    Other(&'e Expr),
}

impl<'e> ExprShape<'e> {
    fn classify(expr: &'e Expr) -> Self {
        match expr {
            Expr::AddrOf { var } => Self::Address(var),
            Expr::IaddrOf { field_id, base, .. } => Self::FieldAddress {
                field_id: *field_id,
                base,
            },
            Expr::Dread { var, .. } => Self::DirectVar(var),
            Expr::Regread { reg, .. } => Self::DirectReg(reg),
            Expr::Iread(node) => Self::IndirectAccess(node),
            Expr::Binary { op, lhs, rhs, .. } if matches!(op, BinaryOp::Add | BinaryOp::Sub) => {
                Self::Arithmetic { op: *op, lhs, rhs }
            }
            Expr::Array { ty, base, indices, .. } => Self::ArrayElement {
                ptr_ty: *ty,
                base,
                indices,
            },
            Expr::Cvt { opnd, .. } => Self::Cast(opnd),
            Expr::Select {
                cond,
                then_expr,
                else_expr,
                ..
            } => Self::Select {
                cond,
                then_expr,
                else_expr,
            },
            Expr::IntrinsicOp {
                intrinsic, opnds, ..
            } => Self::Intrinsic {
                intrinsic: *intrinsic,
                opnds,
            },
            other => Self::Other(other),
        }
    }
}

impl<'a> AliasClass<'a> {
    /// Resolve `expr` to a location
    pub fn expr_alias_info(&mut self, expr: &Expr) -> AliasResult<AliasInfo> {
        match ExprShape::classify(expr) {
            ExprShape::Address(var) => {
                let Some(target) = self.symbol_ost(var.sym, var.field_id)? else {
                    return Ok(AliasInfo::NONE);
                };
                Ok(self
                    .addrof_ost(target)
                    .map_or(AliasInfo::NONE, |addr| AliasInfo::of(self.table.zero_version(addr))))
            }
            ExprShape::FieldAddress { field_id, base } => {
                let info = self.expr_alias_info(base)?;
                Ok(info.with_field(info.field_id + field_id))
            }
            ExprShape::DirectVar(var) => {
                if var.field_id != 0 {
                    if let Some(whole) = self.symbol_ost(var.sym, 0)? {
                        self.addrof_ost(whole);
                    }
                }
                let Some(ost) = self.symbol_ost(var.sym, var.field_id)? else {
                    return Ok(AliasInfo::NONE);
                };
                Ok(AliasInfo::of(self.version_of(ost, var.version)))
            }
            ExprShape::DirectReg(reg) => {
                let Some(ost) = self.preg_ost(reg.preg)? else {
                    return Ok(AliasInfo::NONE);
                };
                Ok(AliasInfo::of(self.version_of(ost, reg.version)))
            }
            ExprShape::IndirectAccess(node) => {
                let ost = self.indirect_ost(node.ty, node.field_id, &node.addr, node.prim)?;
                Ok(ost.map_or(AliasInfo::NONE, |o| AliasInfo::of(self.table.zero_version(o))))
            }
            ExprShape::Arithmetic { op, lhs, rhs } => self.arithmetic_info(op, lhs, rhs),
            ExprShape::ArrayElement {
                ptr_ty,
                base,
                indices,
            } => {
                let info = self.expr_alias_info(base)?;
                for index in indices {
                    self.expr_alias_info(index)?;
                }
                if !info.is_resolved() {
                    return Ok(AliasInfo::NONE);
                }
                let element = self.array_element_offset(ptr_ty, indices);
                Ok(info.with_offset(info.offset + element))
            }
            ExprShape::Cast(opnd) => self.expr_alias_info(opnd),
            ExprShape::Select {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr_alias_info(cond)?;
                let then_info = self.expr_alias_info(then_expr)?;
                let else_info = self.expr_alias_info(else_expr)?;
                Ok(self.merge_arms(then_info, else_info))
            }
            ExprShape::Intrinsic { intrinsic, opnds } => {
                let mut infos = Vec::with_capacity(opnds.len());
                for opnd in opnds {
                    infos.push(self.expr_alias_info(opnd)?);
                }
                match describe(intrinsic).expr_effect {
                    ExprEffect::PassThrough(n) => infos.get(n).copied().ok_or_else(|| {
                        AliasError::malformed_expr(format!(
                            "{} needs operand {}, has {}",
                            intrinsic.as_str(),
                            n,
                            infos.len()
                        ))
                    }),
                    ExprEffect::PointeeEscaped => {
                        if self.collecting() {
                            for vst in infos.iter().filter_map(|i| i.vst) {
                                let ost = self.table.ost_of(vst);
                                self.mark_next_lev_nads(ost);
                            }
                        }
                        Ok(AliasInfo::NONE)
                    }
                    ExprEffect::Ignore => Ok(AliasInfo::NONE),
                }
            }
            ExprShape::Other(expr) => {
                for opnd in expr.operands() {
                    self.expr_alias_info(opnd)?;
                }
                Ok(AliasInfo::NONE)
            }
        }
    }

    fn arithmetic_info(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> AliasResult<AliasInfo> {
        // constant + pointer
        let (base, other) = if op == BinaryOp::Add && matches!(lhs, Expr::Const { .. }) {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        let info = self.expr_alias_info(base)?;
        self.expr_alias_info(other)?;
        if !info.is_resolved() {
            return Ok(AliasInfo::NONE);
        }
        let delta = match other {
            Expr::Const { value, .. } => {
                let bits = OffsetType::from_bytes(*value);
                if op == BinaryOp::Sub {
                    bits.negate()
                } else {
                    bits
                }
            }
            _ => OffsetType::Invalid,
        };
        Ok(info.with_offset(info.offset + delta))
    }

    /// Row-major bit offset of a constant element index
    fn array_element_offset(&self, ptr_ty: TyIdx, indices: &[Expr]) -> OffsetType {
        let types = self.env.types;
        let Some(MirType::Array { elem, dims }) = types.pointee(ptr_ty).and_then(|t| types.get(t))
        else {
            return OffsetType::Invalid;
        };
        if dims.len() != indices.len() {
            return OffsetType::Invalid;
        }
        let total = dims.iter().try_fold(1u64, |acc, d| acc.checked_mul(*d));
        if total.map_or(true, |t| t > self.config.array_offset_threshold) {
            return OffsetType::Invalid;
        }
        let mut linear = 0i64;
        for (index, dim) in indices.iter().zip(dims) {
            let Expr::Const { value, .. } = index else {
                return OffsetType::Invalid;
            };
            if *value < 0 || *value as u64 >= *dim {
                return OffsetType::Invalid;
            }
            // total is bounded by the threshold, so this cannot overflow
            linear = linear * *dim as i64 + *value;
        }
        let elem_bits = types.bit_size(*elem) as i64;
        linear
            .checked_mul(elem_bits)
            .map_or(OffsetType::Invalid, OffsetType::Known)
    }

    fn merge_arms(&mut self, then_info: AliasInfo, else_info: AliasInfo) -> AliasInfo {
        let (Some(a), Some(b)) = (then_info.vst, else_info.vst) else {
            return if then_info.is_resolved() {
                then_info
            } else {
                else_info
            };
        };
        if a != b && self.collecting() {
            self.union_vsts(a, b);
        }
        if then_info.offset != else_info.offset || then_info.field_id != else_info.field_id {
            then_info.with_offset(OffsetType::Invalid)
        } else {
            then_info
        }
    }

    /// Location `*(addr).field_id` where `addr` has pointer type `ptr_ty`.
    /// `prim` is the access kind, used when the pointee type is unknown.
    pub(crate) fn indirect_ost(
        &mut self,
        ptr_ty: TyIdx,
        field_id: u32,
        addr: &Expr,
        prim: PrimType,
    ) -> AliasResult<Option<OstIdx>> {
        let info = self.expr_alias_info(addr)?;
        let Some(base_vst) = info.vst else {
            return Ok(None);
        };
        let types = self.env.types;
        let declared = types.pointee(ptr_ty);
        let access = match declared {
            Some(pointee) => types.field(pointee, field_id).ok_or_else(|| {
                AliasError::malformed_expr(format!(
                    "field {} does not exist in {}",
                    field_id,
                    types.name(pointee)
                ))
            })?,
            None if field_id == 0 => FieldInfo {
                ty: types.prim(prim),
                bit_offset: 0,
                is_final: false,
                is_private: false,
            },
            None => {
                return Err(AliasError::malformed_expr(format!(
                    "field {} accessed through untyped pointer {}",
                    field_id,
                    types.name(ptr_ty)
                )))
            }
        };

        let base_ost = self.table.ost_of(base_vst);
        if self.table.ost(base_ost).is_address_view() {
            return self.deref_address(base_ost, info, field_id, declared, access);
        }

        let b = self.table.ost(base_ost);
        let (pending_ty, pending_off) = match (types.pointee(b.ty), info.field_id) {
            (actual, 0) => (actual, OffsetType::ZERO),
            (Some(actual), fid) => match types.field(actual, fid) {
                Some(f) => (Some(f.ty), OffsetType::from_bits(f.bit_offset)),
                None => (None, OffsetType::Invalid),
            },
            (None, _) => (None, OffsetType::Invalid),
        };
        let mut offset = info.offset + pending_off + OffsetType::from_bits(access.bit_offset);
        if let (Some(actual), Some(declared)) = (pending_ty, declared) {
            if actual != declared {
                offset = OffsetType::Invalid;
            }
        }

        let key = OstKey {
            base: b.base,
            indirect_lev: b.indirect_lev + 1,
            field_id: info.field_id + field_id,
            offset,
            ty: access.ty,
            prev: Some(base_ost),
        };
        let mut name = format!("*{}", b.name);
        if key.field_id != 0 {
            name.push_str(&format!(".{}", key.field_id));
        }
        if offset != OffsetType::ZERO {
            name.push_str(&format!("+{}", offset));
        }
        let attrs = OstAttrs {
            bit_size: nonzero(types.bit_size(access.ty)),
            is_final: access.is_final,
            is_private: access.is_private,
            read_only: false,
            name,
        };
        Ok(self.find_or_create_ost(key, attrs))
    }

    /// Dereference of `&target` (plus whatever field/offset was added to it)
    fn deref_address(
        &mut self,
        addr_ost: OstIdx,
        info: AliasInfo,
        field_id: u32,
        declared: Option<TyIdx>,
        access: FieldInfo,
    ) -> AliasResult<Option<OstIdx>> {
        let types = self.env.types;
        let target = self
            .table
            .next_level(addr_ost)
            .first()
            .copied()
            .ok_or_else(|| AliasError::invariant("address-of descriptor without a target"))?;
        let t = self.table.ost(target);
        let (base, t_ty, t_field, t_offset, read_only) = (t.base, t.ty, t.field_id, t.offset, t.read_only);
        let t_name = t.name.clone();
        let pending = types.field(t_ty, info.field_id);

        let same_view = info.offset == OffsetType::ZERO
            && match (pending, declared) {
                (Some(p), Some(d)) => p.ty == d,
                (Some(_), None) => true,
                (None, _) => false,
            };
        if same_view {
            if let Some(sym) = self.table.ost(target).symbol() {
                return self.symbol_ost(sym, t_field + info.field_id + field_id);
            }
        }

        // reinterpreted through a cast or a byte offset
        let pending_off = pending.map_or(OffsetType::Invalid, |p| OffsetType::from_bits(p.bit_offset));
        let offset = t_offset + pending_off + info.offset + OffsetType::from_bits(access.bit_offset);
        let key = OstKey {
            base,
            indirect_lev: 0,
            field_id: 0,
            offset,
            ty: access.ty,
            prev: Some(addr_ost),
        };
        let attrs = OstAttrs {
            bit_size: nonzero(types.bit_size(access.ty)),
            read_only,
            name: format!("{}@{}", t_name, offset),
            ..OstAttrs::default()
        };
        Ok(self.find_or_create_ost(key, attrs))
    }
}

#[inline]
fn nonzero(bits: u64) -> Option<u64> {
    (bits != 0).then_some(bits)
}
