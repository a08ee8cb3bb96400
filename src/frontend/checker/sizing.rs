//! Pass 3: struct self-storage detection and layout.
//!
//! A depth-first walk over the value-typed (non-pointer) portion of each
//! struct's fields, arrays treated as their element type. A struct that
//! reaches its own id stores itself by value: `STRUCT_INFINITE_SIZE`, with
//! the field chain printed root-first. Finite structs get a greedy layout:
//! field sizes accumulate in declaration order, padding is inserted when
//! the next field's alignment exceeds the running field's size, the struct
//! alignment is the maximum field alignment, and the tail is padded.

use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::program::{Layout, StructId};
use crate::frontend::symbols::{Ty, TyKind};
use crate::frontend::token::BasicType;
use crate::support::NameId;

use super::Checker;

impl Checker<'_, '_> {
    pub(crate) fn pass_3_sizing(&mut self) {
        let mut visited: Vec<StructId> = Vec::new();
        let mut chain: Vec<NameId> = Vec::new();

        for struct_id in 0..self.program.structs.len() {
            visited.clear();
            chain.clear();

            if self.struct_stores_self(struct_id, struct_id, &mut visited, &mut chain) {
                self.program.structs[struct_id].infinite = true;

                let path: Vec<&str> = chain.iter().rev().map(|name| self.name(*name)).collect();
                let info = &self.program.structs[struct_id];
                let origin = self
                    .session
                    .ast(info.module)
                    .map(|ast| (info.module, ast.structs[info.decl_index].ident.span));
                let mut diagnostic = Diagnostic::new(ErrorKind::StructInfiniteSize)
                    .with_info(format!("field access path: {}", path.join(".")));
                if let Some((module, span)) = origin {
                    diagnostic = diagnostic.at(module, span);
                }
                self.report(diagnostic);
            } else {
                self.compute_struct_layout(struct_id);
            }
        }
    }

    /// Does any value-typed descendant of `in_struct` have `target`'s id?
    /// On success the field chain is filled leaf-first.
    fn struct_stores_self(
        &self,
        in_struct: StructId,
        target: StructId,
        visited: &mut Vec<StructId>,
        chain: &mut Vec<NameId>,
    ) -> bool {
        for field in &self.program.structs[in_struct].fields {
            let Some(field_struct) = value_struct_id(&field.ty) else { continue };

            if field_struct == target {
                chain.push(field.name);
                return true;
            }
            if visited.contains(&field_struct) {
                continue;
            }
            visited.push(field_struct);

            if self.struct_stores_self(field_struct, target, visited, chain) {
                chain.push(field.name);
                return true;
            }
        }
        false
    }

    fn compute_struct_layout(&mut self, struct_id: StructId) {
        if self.program.structs[struct_id].layout.is_some() || self.program.structs[struct_id].infinite {
            return;
        }

        let field_tys: Vec<Ty> = self.program.structs[struct_id]
            .fields
            .iter()
            .map(|field| field.ty.clone())
            .collect();

        let mut layouts = Vec::with_capacity(field_tys.len());
        for ty in &field_tys {
            match self.type_layout(ty) {
                Some(layout) => layouts.push(layout),
                None => {
                    // A `string` stored by value has no representation yet;
                    // unsized struct fields were already diagnosed.
                    if value_contains_string(ty) {
                        let info = &self.program.structs[struct_id];
                        let origin = self
                            .session
                            .ast(info.module)
                            .map(|ast| (info.module, ast.structs[info.decl_index].ident.span));
                        let mut diagnostic = Diagnostic::new(ErrorKind::CompilerInternal)
                            .with_info("string has no defined size");
                        if let Some((module, span)) = origin {
                            diagnostic = diagnostic.at(module, span);
                        }
                        self.report(diagnostic);
                    }
                    return;
                }
            }
        }

        let mut total: u64 = 0;
        let mut max_align: u64 = 0;
        for (index, layout) in layouts.iter().enumerate() {
            total += layout.size;
            if layout.align > max_align {
                max_align = layout.align;
            }
            let next_align = if index + 1 < layouts.len() {
                layouts[index + 1].align
            } else {
                max_align
            };
            if next_align > layout.size {
                total += next_align - layout.size;
            }
        }

        self.program.structs[struct_id].layout = Some(Layout {
            size: total,
            align: max_align,
        });
    }

    /// Size and alignment of a resolved type; `None` for `string` stored by
    /// value and for structs without a finite layout.
    pub(crate) fn type_layout(&mut self, ty: &Ty) -> Option<Layout> {
        if ty.pointer_level > 0 {
            return Some(Layout { size: 8, align: 8 });
        }
        match &ty.kind {
            TyKind::Basic(BasicType::String) => None,
            TyKind::Basic(basic) => Some(Layout {
                size: basic.size(),
                align: basic.align(),
            }),
            TyKind::Enum(enum_id) => {
                let basic = self.program.enums[*enum_id].basic_type;
                Some(Layout {
                    size: basic.size(),
                    align: basic.align(),
                })
            }
            TyKind::Array(len, element) => {
                let element = self.type_layout(element)?;
                Some(Layout {
                    size: element.size.checked_mul(*len)?,
                    align: element.align,
                })
            }
            TyKind::Proc(_) => Some(Layout { size: 8, align: 8 }),
            TyKind::Struct(struct_id) => {
                let struct_id = *struct_id;
                if self.program.structs[struct_id].infinite {
                    return None;
                }
                if let Some(layout) = self.program.structs[struct_id].layout {
                    return Some(layout);
                }
                // On-demand sizing (sizeof in a constant before pass 3
                // reaches this struct); guard against re-entry.
                if self.sizing_stack.contains(&struct_id) {
                    return None;
                }
                self.sizing_stack.push(struct_id);
                self.compute_struct_layout(struct_id);
                self.sizing_stack.pop();
                self.program.structs[struct_id].layout
            }
        }
    }
}

/// The struct id stored by value under `ty`, looking through arrays but not
/// pointers.
fn value_struct_id(ty: &Ty) -> Option<StructId> {
    if ty.pointer_level > 0 {
        return None;
    }
    match &ty.kind {
        TyKind::Struct(id) => Some(*id),
        TyKind::Array(_, element) => value_struct_id(element),
        _ => None,
    }
}

fn value_contains_string(ty: &Ty) -> bool {
    if ty.pointer_level > 0 {
        return false;
    }
    match &ty.kind {
        TyKind::Basic(BasicType::String) => true,
        TyKind::Array(_, element) => value_contains_string(element),
        _ => false,
    }
}
