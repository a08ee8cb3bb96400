//! The program registry.
//!
//! Four flat vectors of per-kind info records, one entry per declaration in
//! the whole program. Insertion happens only in checker pass 1 and is
//! append-only; later passes fill in resolved signatures, layout and
//! constant values but never reorder or remove. The vector index is the
//! canonical cross-module identity of an entity.

use std::collections::HashMap;

use crate::frontend::module::ModuleId;
use crate::frontend::symbols::{ConstValue, Ty};
use crate::frontend::token::BasicType;
use crate::support::NameId;

pub type ProcId = usize;
pub type StructId = usize;
pub type EnumId = usize;
pub type GlobalId = usize;

/// Where a procedure declaration lives inside its module's AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcSource {
    /// `ast.procs[index]`
    Top(usize),
    /// `ast.impls[impl_index].procs[index]`
    Impl(usize, usize),
}

#[derive(Debug)]
pub struct ProcInfo {
    pub module: ModuleId,
    pub source: ProcSource,
    pub name: NameId,
    pub is_external: bool,
    pub is_variadic: bool,
    /// Resolved in pass 2.
    pub sig: Option<ProcSignature>,
}

#[derive(Debug, Clone)]
pub struct ProcSignature {
    pub params: Vec<(NameId, Ty)>,
    pub return_type: Option<Ty>,
}

#[derive(Debug)]
pub struct StructInfo {
    pub module: ModuleId,
    pub decl_index: usize,
    pub name: NameId,
    /// Resolved field types, in declaration order; filled in pass 2.
    pub fields: Vec<FieldInfo>,
    /// Member procedures from `impl` blocks.
    pub methods: HashMap<NameId, ProcId>,
    /// Set in pass 3 when the struct proves finite.
    pub layout: Option<Layout>,
    /// Set in pass 3 for structs that store themselves by value; such a
    /// struct is never recursed into again.
    pub infinite: bool,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: NameId,
    pub ty: Ty,
    pub has_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

#[derive(Debug)]
pub struct EnumInfo {
    pub module: ModuleId,
    pub decl_index: usize,
    pub name: NameId,
    pub basic_type: BasicType,
    pub variants: Vec<VariantInfo>,
}

#[derive(Debug)]
pub struct VariantInfo {
    pub name: NameId,
    /// Folded in pass 4.
    pub value: Option<ConstValue>,
}

#[derive(Debug)]
pub struct GlobalInfo {
    pub module: ModuleId,
    pub decl_index: usize,
    pub name: NameId,
    /// Inferred from the initializer in pass 4.
    pub ty: Option<Ty>,
    pub value: Option<ConstValue>,
}

#[derive(Debug, Default)]
pub struct Program {
    pub procs: Vec<ProcInfo>,
    pub structs: Vec<StructInfo>,
    pub enums: Vec<EnumInfo>,
    pub globals: Vec<GlobalInfo>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_proc(&mut self, info: ProcInfo) -> ProcId {
        self.procs.push(info);
        self.procs.len() - 1
    }

    pub fn add_struct(&mut self, info: StructInfo) -> StructId {
        self.structs.push(info);
        self.structs.len() - 1
    }

    pub fn add_enum(&mut self, info: EnumInfo) -> EnumId {
        self.enums.push(info);
        self.enums.len() - 1
    }

    pub fn add_global(&mut self, info: GlobalInfo) -> GlobalId {
        self.globals.push(info);
        self.globals.len() - 1
    }
}
