//! Type table
//!
//! Primitive kinds, aggregate/pointer/array types and their layout.
//!
//! Field ids of an aggregate are flattened in pre-order: field id 0 is the
//! whole object, the first declared field is 1, and a nested aggregate's own
//! fields are numbered right after it. So in `struct { struct { a; b } s; c }`
//! the ids are `s = 1, s.a = 2, s.b = 3, c = 4`. A field id inside a nested
//! aggregate can therefore be rebased onto its container by plain addition.

use serde::{Deserialize, Serialize};

/// Bit width of an address on the target
pub const POINTER_BITS: u64 = 64;

/// Index into a [`TypeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TyIdx(pub u32);

impl TyIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    Void,
    U1,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Raw pointer
    Ptr,
    /// Managed reference
    Ref,
    /// Dynamically typed value, may hold an address
    Dyn,
    /// Aggregate value
    Agg,
}

impl PrimType {
    /// Every primitive, in the order the type table pre-registers them
    pub const ALL: [PrimType; 16] = [
        PrimType::Void,
        PrimType::U1,
        PrimType::I8,
        PrimType::U8,
        PrimType::I16,
        PrimType::U16,
        PrimType::I32,
        PrimType::U32,
        PrimType::I64,
        PrimType::U64,
        PrimType::F32,
        PrimType::F64,
        PrimType::Ptr,
        PrimType::Ref,
        PrimType::Dyn,
        PrimType::Agg,
    ];

    pub fn bit_size(self) -> u64 {
        match self {
            Self::Void | Self::Agg => 0,
            Self::U1 | Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 | Self::F32 => 32,
            Self::I64 | Self::U64 | Self::F64 => 64,
            Self::Ptr | Self::Ref | Self::Dyn => POINTER_BITS,
        }
    }

    #[inline]
    pub fn is_address(self) -> bool {
        matches!(self, Self::Ptr | Self::Ref)
    }

    /// Address, or a dynamic value that may carry one
    #[inline]
    pub fn is_potential_address(self) -> bool {
        self.is_address() || self == Self::Dyn
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::U1
                | Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
        )
    }

    /// Integer wide enough to hold a reinterpreted address
    #[inline]
    pub fn is_address_width_integer(self) -> bool {
        self.is_integer() && self.bit_size() == POINTER_BITS
    }

    /// Address or address-width integer
    #[inline]
    pub fn is_pointer_shaped(self) -> bool {
        self.is_potential_address() || self.is_address_width_integer()
    }

    #[inline]
    pub fn is_char(self) -> bool {
        matches!(self, Self::I8 | Self::U8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::U1 => "u1",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Ptr => "ptr",
            Self::Ref => "ref",
            Self::Dyn => "dyn",
            Self::Agg => "agg",
        }
    }
}

/// Struct, union or class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggKind {
    Struct,
    Union,
    Class,
}

/// Declared field of an aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TyIdx,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_private: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TyIdx) -> Self {
        Self {
            name: name.into(),
            ty,
            is_final: false,
            is_private: false,
        }
    }

    pub fn final_field(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn private_field(mut self) -> Self {
        self.is_private = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MirType {
    Scalar {
        prim: PrimType,
    },
    Pointer {
        pointee: TyIdx,
    },
    Array {
        elem: TyIdx,
        dims: Vec<u64>,
    },
    Aggregate {
        name: String,
        agg: AggKind,
        fields: Vec<FieldDecl>,
        #[serde(default)]
        parent: Option<TyIdx>,
    },
    Function,
}

/// Resolved field of an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub ty: TyIdx,
    pub bit_offset: u64,
    pub is_final: bool,
    pub is_private: bool,
}

/// All types of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    types: Vec<MirType>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Table with every primitive pre-registered at `TyIdx(prim as u32)`
    pub fn new() -> Self {
        Self {
            types: PrimType::ALL
                .iter()
                .map(|&prim| MirType::Scalar { prim })
                .collect(),
        }
    }

    #[inline]
    pub fn prim(&self, prim: PrimType) -> TyIdx {
        TyIdx(prim as u32)
    }

    pub fn add(&mut self, ty: MirType) -> TyIdx {
        if let Some(pos) = self.types.iter().position(|t| *t == ty) {
            return TyIdx(pos as u32);
        }
        self.types.push(ty);
        TyIdx(self.types.len() as u32 - 1)
    }

    pub fn pointer_to(&mut self, pointee: TyIdx) -> TyIdx {
        self.add(MirType::Pointer { pointee })
    }

    pub fn get(&self, ty: TyIdx) -> Option<&MirType> {
        self.types.get(ty.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn prim_of(&self, ty: TyIdx) -> PrimType {
        match self.get(ty) {
            Some(MirType::Scalar { prim }) => *prim,
            Some(MirType::Pointer { .. }) => PrimType::Ptr,
            Some(MirType::Array { .. }) | Some(MirType::Aggregate { .. }) => PrimType::Agg,
            Some(MirType::Function) | None => PrimType::Void,
        }
    }

    pub fn pointee(&self, ty: TyIdx) -> Option<TyIdx> {
        match self.get(ty) {
            Some(MirType::Pointer { pointee }) => Some(*pointee),
            _ => None,
        }
    }

    pub fn is_union(&self, ty: TyIdx) -> bool {
        matches!(
            self.get(ty),
            Some(MirType::Aggregate {
                agg: AggKind::Union,
                ..
            })
        )
    }

    pub fn is_class(&self, ty: TyIdx) -> bool {
        matches!(
            self.get(ty),
            Some(MirType::Aggregate {
                agg: AggKind::Class,
                ..
            })
        )
    }

    pub fn is_aggregate(&self, ty: TyIdx) -> bool {
        matches!(
            self.get(ty),
            Some(MirType::Aggregate { .. }) | Some(MirType::Array { .. })
        )
    }

    pub fn name(&self, ty: TyIdx) -> String {
        match self.get(ty) {
            Some(MirType::Scalar { prim }) => prim.as_str().to_string(),
            Some(MirType::Pointer { pointee }) => format!("*{}", self.name(*pointee)),
            Some(MirType::Array { elem, dims }) => {
                let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                format!("[{}]{}", dims.join(","), self.name(*elem))
            }
            Some(MirType::Aggregate { name, .. }) => name.clone(),
            Some(MirType::Function) => "fn".to_string(),
            None => format!("<ty {}>", ty.0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Layout
    // ═══════════════════════════════════════════════════════════════════════

    /// (size, alignment) in bits
    fn layout(&self, ty: TyIdx) -> (u64, u64) {
        match self.get(ty) {
            Some(MirType::Scalar { prim }) => {
                let bits = prim.bit_size();
                (bits, bits.max(8))
            }
            Some(MirType::Pointer { .. }) => (POINTER_BITS, POINTER_BITS),
            Some(MirType::Array { elem, dims }) => {
                let (elem_bits, align) = self.layout(*elem);
                let count: u64 = dims.iter().product();
                (elem_bits.saturating_mul(count), align)
            }
            Some(MirType::Aggregate { agg, fields, .. }) => {
                let mut size = 0u64;
                let mut align = 8u64;
                for field in fields {
                    let (bits, field_align) = self.layout(field.ty);
                    align = align.max(field_align);
                    match agg {
                        AggKind::Union => size = size.max(bits),
                        AggKind::Struct | AggKind::Class => {
                            size = round_up(size, field_align) + bits;
                        }
                    }
                }
                (round_up(size, align), align)
            }
            Some(MirType::Function) | None => (0, 8),
        }
    }

    pub fn bit_size(&self, ty: TyIdx) -> u64 {
        self.layout(ty).0
    }

    /// Bit offset of every declared (top-level) field
    fn field_offsets(&self, ty: TyIdx) -> Vec<u64> {
        let Some(MirType::Aggregate { agg, fields, .. }) = self.get(ty) else {
            return Vec::new();
        };
        let mut offsets = Vec::with_capacity(fields.len());
        let mut cursor = 0u64;
        for field in fields {
            let (bits, align) = self.layout(field.ty);
            match agg {
                AggKind::Union => offsets.push(0),
                AggKind::Struct | AggKind::Class => {
                    cursor = round_up(cursor, align);
                    offsets.push(cursor);
                    cursor += bits;
                }
            }
        }
        offsets
    }

    /// Number of flattened field ids below `ty` (0 for non-aggregates)
    pub fn field_count(&self, ty: TyIdx) -> u32 {
        match self.get(ty) {
            Some(MirType::Aggregate { fields, .. }) => fields
                .iter()
                .map(|f| 1 + self.field_count(f.ty))
                .sum(),
            _ => 0,
        }
    }

    pub fn has_subfields(&self, ty: TyIdx) -> bool {
        self.field_count(ty) > 0
    }

    /// Resolve a flattened field id; field id 0 is `ty` itself
    pub fn field(&self, ty: TyIdx, field_id: u32) -> Option<FieldInfo> {
        if field_id == 0 {
            return Some(FieldInfo {
                ty,
                bit_offset: 0,
                is_final: false,
                is_private: false,
            });
        }
        let Some(MirType::Aggregate { fields, .. }) = self.get(ty) else {
            return None;
        };
        let offsets = self.field_offsets(ty);
        let mut remaining = field_id;
        for (field, offset) in fields.iter().zip(offsets) {
            if remaining == 1 {
                return Some(FieldInfo {
                    ty: field.ty,
                    bit_offset: offset,
                    is_final: field.is_final,
                    is_private: field.is_private,
                });
            }
            let nested = self.field_count(field.ty);
            if remaining - 1 <= nested {
                let inner = self.field(field.ty, remaining - 1)?;
                return Some(FieldInfo {
                    ty: inner.ty,
                    bit_offset: offset + inner.bit_offset,
                    is_final: field.is_final || inner.is_final,
                    is_private: field.is_private || inner.is_private,
                });
            }
            remaining -= 1 + nested;
        }
        None
    }

    /// `outer` is `inner` or holds it as a (transitively nested) member
    pub fn contains_type(&self, outer: TyIdx, inner: TyIdx) -> bool {
        if outer == inner {
            return true;
        }
        match self.get(outer) {
            Some(MirType::Aggregate { fields, .. }) => {
                fields.iter().any(|f| self.contains_type(f.ty, inner))
            }
            Some(MirType::Array { elem, .. }) => self.contains_type(*elem, inner),
            _ => false,
        }
    }

    /// `sup` is a (transitive) parent class of `sub`
    pub fn is_super_class(&self, sup: TyIdx, sub: TyIdx) -> bool {
        let mut current = sub;
        // parent chains are acyclic in well-formed input; bound the walk anyway
        for _ in 0..self.types.len() {
            match self.get(current) {
                Some(MirType::Aggregate {
                    parent: Some(parent),
                    ..
                }) => {
                    if *parent == sup {
                        return true;
                    }
                    current = *parent;
                }
                _ => return false,
            }
        }
        false
    }
}

#[inline]
fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_table() -> (TypeTable, TyIdx, TyIdx) {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let i8_ty = types.prim(PrimType::I8);
        let inner = types.add(MirType::Aggregate {
            name: "Inner".into(),
            agg: AggKind::Struct,
            fields: vec![FieldDecl::new("a", i8_ty), FieldDecl::new("b", i32_ty)],
            parent: None,
        });
        let outer = types.add(MirType::Aggregate {
            name: "Outer".into(),
            agg: AggKind::Struct,
            fields: vec![FieldDecl::new("s", inner), FieldDecl::new("c", i32_ty)],
            parent: None,
        });
        (types, inner, outer)
    }

    #[test]
    fn test_struct_layout_with_alignment() {
        let (types, inner, outer) = nested_table();
        // i8 at 0, i32 aligned to 32
        assert_eq!(types.bit_size(inner), 64);
        assert_eq!(types.bit_size(outer), 96);
    }

    #[test]
    fn test_flattened_field_ids() {
        let (types, inner, outer) = nested_table();
        let i32_ty = types.prim(PrimType::I32);
        assert_eq!(types.field_count(outer), 4);

        let s = types.field(outer, 1).unwrap();
        assert_eq!((s.ty, s.bit_offset), (inner, 0));
        let s_b = types.field(outer, 3).unwrap();
        assert_eq!((s_b.ty, s_b.bit_offset), (i32_ty, 32));
        let c = types.field(outer, 4).unwrap();
        assert_eq!(c.bit_offset, 64);
        assert!(types.field(outer, 5).is_none());

        // rebasing: field 2 of Inner is field 1 + 2 of Outer
        let via_inner = types.field(inner, 2).unwrap();
        assert_eq!(via_inner.bit_offset + s.bit_offset, s_b.bit_offset);
    }

    #[test]
    fn test_union_fields_share_offset() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let f64_ty = types.prim(PrimType::F64);
        let u = types.add(MirType::Aggregate {
            name: "U".into(),
            agg: AggKind::Union,
            fields: vec![FieldDecl::new("i", i32_ty), FieldDecl::new("d", f64_ty)],
            parent: None,
        });
        assert!(types.is_union(u));
        assert_eq!(types.field(u, 2).unwrap().bit_offset, 0);
        assert_eq!(types.bit_size(u), 64);
    }

    #[test]
    fn test_pointer_interning_and_hierarchy() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let p1 = types.pointer_to(i32_ty);
        let p2 = types.pointer_to(i32_ty);
        assert_eq!(p1, p2);
        assert_eq!(types.pointee(p1), Some(i32_ty));

        let base = types.add(MirType::Aggregate {
            name: "Base".into(),
            agg: AggKind::Class,
            fields: vec![],
            parent: None,
        });
        let derived = types.add(MirType::Aggregate {
            name: "Derived".into(),
            agg: AggKind::Class,
            fields: vec![FieldDecl::new("x", i32_ty)],
            parent: Some(base),
        });
        assert!(types.is_super_class(base, derived));
        assert!(!types.is_super_class(derived, base));
    }
}
