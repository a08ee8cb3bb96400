//! Per-module symbol tables and resolved types.
//!
//! The parser leaves custom type references unresolved; the checker resolves
//! them into [`Ty`] values whose struct/enum references are Program-registry
//! indices. Those indices are the canonical cross-module identity of an
//! entity.

use std::collections::HashMap;

use crate::frontend::module::ModuleId;
use crate::frontend::program::{EnumId, GlobalId, ProcId, Program, StructId};
use crate::frontend::token::BasicType;
use crate::support::{Interner, NameId};

/// A fully resolved type: leading pointer levels plus a base kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Ty {
    pub pointer_level: u32,
    pub kind: TyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TyKind {
    Basic(BasicType),
    Struct(StructId),
    Enum(EnumId),
    Array(u64, Box<Ty>),
    Proc(Box<ProcTy>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcTy {
    pub params: Vec<Ty>,
    pub return_type: Option<Ty>,
}

impl Ty {
    pub fn basic(basic: BasicType) -> Self {
        Self {
            pointer_level: 0,
            kind: TyKind::Basic(basic),
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_level > 0
    }

    /// The basic type of a non-pointer basic value, if that is what this is.
    pub fn as_value_basic(&self) -> Option<BasicType> {
        if self.pointer_level != 0 {
            return None;
        }
        match self.kind {
            TyKind::Basic(basic) => Some(basic),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.as_value_basic() == Some(BasicType::Bool)
    }

    pub fn is_integer(&self) -> bool {
        self.as_value_basic().is_some_and(BasicType::is_integer)
    }

    pub fn is_enum(&self) -> bool {
        self.pointer_level == 0 && matches!(self.kind, TyKind::Enum(_))
    }
}

/// Exact type equality, used wherever no implicit conversion applies.
pub fn ty_matches(a: &Ty, b: &Ty) -> bool {
    a == b
}

/// Value-preserving widening within one numeric kind. This is the only
/// implicit conversion in the language; everything else needs `cast`.
pub fn basic_widens(from: BasicType, to: BasicType) -> bool {
    if from == to {
        return true;
    }
    if from.is_float() && to.is_float() {
        return from.size() <= to.size();
    }
    if from.is_integer() && to.is_integer() {
        return match (from.is_signed_integer(), to.is_signed_integer()) {
            (true, true) | (false, false) => from.size() <= to.size(),
            // Unsigned fits in a strictly wider signed type.
            (false, true) => from.size() < to.size(),
            (true, false) => false,
        };
    }
    false
}

/// Whether a value of type `from` can be used where `to` is expected.
pub fn ty_coerces(from: &Ty, to: &Ty) -> bool {
    if ty_matches(from, to) {
        return true;
    }
    match (from.as_value_basic(), to.as_value_basic()) {
        (Some(from_basic), Some(to_basic)) => basic_widens(from_basic, to_basic),
        _ => false,
    }
}

/// Render a type for diagnostic context lines.
pub fn describe_ty(ty: &Ty, program: &Program, interner: &Interner) -> String {
    let mut out = "*".repeat(ty.pointer_level as usize);
    match &ty.kind {
        TyKind::Basic(basic) => out.push_str(basic.as_str()),
        TyKind::Struct(id) => out.push_str(interner.get(program.structs[*id].name)),
        TyKind::Enum(id) => out.push_str(interner.get(program.enums[*id].name)),
        TyKind::Array(len, element) => {
            out.push_str(&format!("[{}]{}", len, describe_ty(element, program, interner)));
        }
        TyKind::Proc(proc_ty) => {
            let params: Vec<String> = proc_ty
                .params
                .iter()
                .map(|param| describe_ty(param, program, interner))
                .collect();
            out.push_str(&format!("({})", params.join(", ")));
            if let Some(ret) = &proc_ty.return_type {
                out.push_str(&format!(" -> {}", describe_ty(ret, program, interner)));
            }
        }
    }
    out
}

/// A folded constant value. `Int` vs `UInt` tracks the literal kind the
/// evaluator works with; the basic type comes from context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(NameId),
    Enum(EnumId, u32),
}

/// What a name resolves to at module scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Module(ModuleId),
    Struct(StructId),
    Enum(EnumId),
    Proc(ProcId),
    Global(GlobalId),
}

/// One module's flat symbol table. All declaration kinds share a single
/// namespace, so insertion doubles as the uniqueness check of pass 1.
///
/// `use` aliases reserve their name in pass 1 and receive their resolved
/// symbol in pass 2 via [`define`](Self::define).
#[derive(Debug, Default)]
pub struct ModuleSymbols {
    declared: std::collections::HashSet<NameId>,
    table: HashMap<NameId, SymbolKind>,
}

impl ModuleSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol; `Err(())` when the name is already taken.
    pub fn insert(&mut self, name: NameId, kind: SymbolKind) -> Result<(), ()> {
        if !self.declared.insert(name) {
            return Err(());
        }
        self.table.insert(name, kind);
        Ok(())
    }

    /// Claim a name without binding it yet (pass-1 side of `use` aliases).
    pub fn reserve(&mut self, name: NameId) -> Result<(), ()> {
        if self.declared.insert(name) {
            Ok(())
        } else {
            Err(())
        }
    }

    /// Bind a previously reserved name.
    pub fn define(&mut self, name: NameId, kind: SymbolKind) {
        self.table.insert(name, kind);
    }

    pub fn find(&self, name: NameId) -> Option<SymbolKind> {
        self.table.get(&name).copied()
    }

    pub fn find_module(&self, name: NameId) -> Option<ModuleId> {
        match self.find(name) {
            Some(SymbolKind::Module(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_struct(&self, name: NameId) -> Option<StructId> {
        match self.find(name) {
            Some(SymbolKind::Struct(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_enum(&self, name: NameId) -> Option<EnumId> {
        match self.find(name) {
            Some(SymbolKind::Enum(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_proc(&self, name: NameId) -> Option<ProcId> {
        match self.find(name) {
            Some(SymbolKind::Proc(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_global(&self, name: NameId) -> Option<GlobalId> {
        match self.find(name) {
            Some(SymbolKind::Global(id)) => Some(id),
            _ => None,
        }
    }

    /// All bound symbols, in unspecified order; callers that need a stable
    /// order (wildcard imports) sort by name text.
    pub fn entries(&self) -> impl Iterator<Item = (NameId, SymbolKind)> + '_ {
        self.table.iter().map(|(&name, &kind)| (name, kind))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_same_kind_only() {
        assert!(basic_widens(BasicType::I8, BasicType::I64));
        assert!(basic_widens(BasicType::U8, BasicType::U16));
        assert!(basic_widens(BasicType::F32, BasicType::F64));
        assert!(basic_widens(BasicType::U8, BasicType::I16));

        assert!(!basic_widens(BasicType::I64, BasicType::I32));
        assert!(!basic_widens(BasicType::U32, BasicType::I32));
        assert!(!basic_widens(BasicType::I32, BasicType::F64));
        assert!(!basic_widens(BasicType::F64, BasicType::F32));
        assert!(!basic_widens(BasicType::Bool, BasicType::I32));
    }

    #[test]
    fn pointers_do_not_coerce() {
        let by_value = Ty::basic(BasicType::I8);
        let by_pointer = Ty {
            pointer_level: 1,
            kind: TyKind::Basic(BasicType::I8),
        };
        assert!(!ty_coerces(&by_value, &by_pointer));
        assert!(!ty_coerces(&by_pointer, &by_value));
        assert!(ty_coerces(&by_pointer, &by_pointer.clone()));
    }

    #[test]
    fn single_namespace_rejects_duplicates() {
        let mut interner = Interner::new();
        let name = interner.intern("Foo");
        let mut symbols = ModuleSymbols::new();
        assert!(symbols.insert(name, SymbolKind::Struct(0)).is_ok());
        assert!(symbols.insert(name, SymbolKind::Proc(1)).is_err());
        assert_eq!(symbols.find_struct(name), Some(0));
        assert_eq!(symbols.find_proc(name), None);
    }

    #[test]
    fn reserved_names_block_later_declarations() {
        let mut interner = Interner::new();
        let alias = interner.intern("V");
        let mut symbols = ModuleSymbols::new();
        assert!(symbols.reserve(alias).is_ok());
        assert!(symbols.insert(alias, SymbolKind::Enum(0)).is_err());
        symbols.define(alias, SymbolKind::Struct(2));
        assert_eq!(symbols.find_struct(alias), Some(2));
    }
}
