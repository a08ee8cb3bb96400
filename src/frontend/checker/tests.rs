//! Checker tests over in-memory module sets.

use crate::frontend;
use crate::frontend::diagnostics::ErrorKind;
use crate::frontend::module::Session;
use crate::frontend::program::Program;
use crate::frontend::symbols::ConstValue;

fn compile_modules(sources: &[(&str, &str)]) -> (Program, Vec<ErrorKind>) {
    let mut session = Session::from_sources(sources);
    let (program, reporter) = frontend::compile(&mut session);
    let kinds = reporter.diagnostics().iter().map(|diagnostic| diagnostic.kind).collect();
    (program, kinds)
}

fn check_main(source: &str) -> Vec<ErrorKind> {
    compile_modules(&[("main", source)]).1
}

/// A `main` procedure satisfying the entry-point rules, prepended so tests
/// can focus on the declaration under test.
const MAIN_OK: &str = "main :: () -> i32 { return 0; }\n";

fn with_main(source: &str) -> String {
    format!("{MAIN_OK}{source}")
}

// ============================================================================
// Pass 1: uniqueness, registration, main module
// ============================================================================

#[test]
fn hello_main_passes_all_passes() {
    let kinds = check_main(MAIN_OK);
    assert_eq!(kinds, vec![]);
}

#[test]
fn duplicate_struct_reports_once_and_halts_after_pass_1() {
    let kinds = check_main(&with_main("Foo :: struct { x: i32; }\nFoo :: struct { x: i32; }"));
    assert_eq!(kinds, vec![ErrorKind::SymbolAlreadyDeclared]);
}

#[test]
fn declaration_kinds_share_one_namespace() {
    let kinds = check_main(&with_main("Foo :: struct { x: i32; }\nFoo :: (a: i32) { return; }"));
    assert_eq!(kinds, vec![ErrorKind::SymbolAlreadyDeclared]);
}

#[test]
fn registry_ids_are_stable_across_modules() {
    let (program, kinds) = compile_modules(&[
        ("a", "One :: struct { x: i32; }\nTwo :: struct { y: i32; }"),
        ("main", &with_main("import a;\nThree :: struct { z: i32; }")),
    ]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.structs.len(), 3);
    // Module order then declaration order.
    let names: Vec<usize> = program.structs.iter().map(|info| info.module).collect();
    assert_eq!(names, vec![0, 0, 1]);
}

#[test]
fn missing_main_module_is_reported() {
    let (_, kinds) = compile_modules(&[("lib", "Foo :: struct { x: i32; }")]);
    assert_eq!(kinds, vec![ErrorKind::MainFileNotFound]);
}

#[test]
fn import_path_not_found() {
    let kinds = check_main(&with_main("import missing;"));
    assert_eq!(kinds, vec![ErrorKind::ImportPathNotFound]);
}

// ============================================================================
// Pass 2: use resolution, signatures, main procedure
// ============================================================================

#[test]
fn cross_module_use_resolves_to_same_struct_id() {
    let (program, kinds) = compile_modules(&[
        ("a", "Vec :: struct { x: i32; y: i32; }"),
        (
            "main",
            "import a;\nuse V = a::Vec;\nmain :: () -> i32 { v: V = .{1, 2}; w: a::Vec = v; return 0; }",
        ),
    ]);
    assert_eq!(kinds, vec![]);
    // One struct entity; the alias resolves to the same registry index, so
    // `v` can initialize a variable of type `a::Vec`.
    assert_eq!(program.structs.len(), 1);
}

#[test]
fn use_of_unknown_symbol_is_reported() {
    let (_, kinds) = compile_modules(&[
        ("a", "Vec :: struct { x: i32; }"),
        ("main", &with_main("import a;\nuse V = a::Missing;")),
    ]);
    assert_eq!(kinds, vec![ErrorKind::UseSymbolNotFound]);
}

#[test]
fn import_symbol_list_and_wildcard_bind_symbols() {
    let (_, kinds) = compile_modules(&[
        ("a", "Vec :: struct { x: i32; }\nsize :: () -> u64 { return 4; }"),
        (
            "main",
            "import a::{Vec, size};\nmain :: () -> i32 { v: Vec = .{1}; s := size(); return 0; }",
        ),
    ]);
    assert_eq!(kinds, vec![]);

    let (_, kinds) = compile_modules(&[
        ("a", "Vec :: struct { x: i32; }"),
        ("main", "import a::*;\nmain :: () -> i32 { v: Vec = .{1}; return 0; }"),
    ]);
    assert_eq!(kinds, vec![]);
}

#[test]
fn duplicate_struct_field() {
    let kinds = check_main(&with_main("Foo :: struct { x: i32; x: i32; }"));
    assert_eq!(kinds, vec![ErrorKind::StructDuplicateField]);
}

#[test]
fn enum_with_zero_variants() {
    let kinds = check_main(&with_main("Flag :: enum { }"));
    assert_eq!(kinds, vec![ErrorKind::EnumZeroVariants]);
}

#[test]
fn enum_on_non_integer_base() {
    let kinds = check_main(&with_main("Flag :: enum :: f32 { A = 0; }"));
    assert_eq!(kinds, vec![ErrorKind::EnumNonIntegerType]);
}

#[test]
fn duplicate_enum_variant() {
    let kinds = check_main(&with_main("Flag :: enum { A = 0; A = 1; }"));
    assert_eq!(kinds, vec![ErrorKind::EnumDuplicateVariant]);
}

#[test]
fn duplicate_proc_param() {
    let kinds = check_main(&with_main("f :: (a: i32, a: i32) { return; }"));
    assert_eq!(kinds, vec![ErrorKind::ProcDuplicateParam]);
}

#[test]
fn unknown_custom_type_in_signature() {
    let kinds = check_main(&with_main("f :: (a: Missing) { return; }"));
    assert_eq!(kinds, vec![ErrorKind::ResolveTypeNotFound]);
}

#[test]
fn main_proc_missing() {
    let kinds = check_main("helper :: () { return; }");
    assert_eq!(kinds, vec![ErrorKind::MainProcNotFound]);
}

#[test]
fn main_proc_signature_rules() {
    assert_eq!(
        check_main("main :: () -> i32 @"),
        vec![ErrorKind::MainProcExternal]
    );
    assert_eq!(
        check_main("main :: (a: i32) -> i32 { return 0; }"),
        vec![ErrorKind::MainNotZeroParams]
    );
    assert_eq!(
        check_main("main :: () { return; }"),
        vec![ErrorKind::MainProcNoReturnType]
    );
    assert_eq!(
        check_main("main :: () -> i64 { return 0; }"),
        vec![ErrorKind::MainProcWrongReturnType]
    );
}

// ============================================================================
// Pass 3: struct sizing
// ============================================================================

#[test]
fn struct_storing_itself_is_infinite() {
    let (_, kinds) = compile_modules(&[("main", &with_main("Node :: struct { next: Node; }"))]);
    assert_eq!(kinds, vec![ErrorKind::StructInfiniteSize]);
}

#[test]
fn infinite_struct_reports_field_chain_root_first() {
    let mut session = Session::from_sources(&[(
        "main",
        &with_main("A :: struct { b: B; }\nB :: struct { a: A; }"),
    )]);
    let (_, reporter) = frontend::compile(&mut session);
    let diagnostic = &reporter.diagnostics()[0];
    assert_eq!(diagnostic.kind, ErrorKind::StructInfiniteSize);
    assert_eq!(diagnostic.info.as_deref(), Some("field access path: b.a"));
}

#[test]
fn pointer_field_breaks_the_cycle() {
    let kinds = check_main(&with_main("Node :: struct { next: *Node; value: i32; }"));
    assert_eq!(kinds, vec![]);
}

#[test]
fn array_field_keeps_the_cycle() {
    let kinds = check_main(&with_main("Node :: struct { nodes: [10]Node; }"));
    assert_eq!(kinds, vec![ErrorKind::StructInfiniteSize]);
}

#[test]
fn layout_inserts_padding_and_takes_max_alignment() {
    let (program, kinds) = compile_modules(&[(
        "main",
        &with_main("Packed :: struct { a: u8; b: u32; }\nPair :: struct { x: i32; y: i32; }"),
    )]);
    assert_eq!(kinds, vec![]);
    let packed = program.structs[0].layout.expect("layout");
    assert_eq!((packed.size, packed.align), (8, 4));
    let pair = program.structs[1].layout.expect("layout");
    assert_eq!((pair.size, pair.align), (8, 4));
}

#[test]
fn pointers_are_pointer_sized_in_layout() {
    let (program, kinds) = compile_modules(&[(
        "main",
        &with_main("Holder :: struct { data: *u8; len: u64; }"),
    )]);
    assert_eq!(kinds, vec![]);
    let layout = program.structs[0].layout.expect("layout");
    assert_eq!((layout.size, layout.align), (16, 8));
}

// ============================================================================
// Pass 4: constant folding
// ============================================================================

#[test]
fn global_folds_to_unsigned_default() {
    let (program, kinds) = compile_modules(&[("main", &with_main("SIZE :: 4096;"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[0].value, Some(ConstValue::UInt(4096)));
}

#[test]
fn negated_min_int_widens_to_signed() {
    let (program, kinds) = compile_modules(&[("main", &with_main("MIN :: -9223372036854775808;"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[0].value, Some(ConstValue::Int(i64::MIN)));
}

#[test]
fn globals_fold_through_each_other() {
    let (program, kinds) = compile_modules(&[("main", &with_main("A :: 1;\nB :: A + A;"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[1].value, Some(ConstValue::UInt(2)));
}

#[test]
fn constant_dependency_cycle_is_reported() {
    let mut session = Session::from_sources(&[("main", &with_main("A :: B + 1;\nB :: A + 1;"))]);
    let (_, reporter) = frontend::compile(&mut session);
    let kinds: Vec<ErrorKind> = reporter.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::ConstevalDependencyCycle]);
    let info = reporter.diagnostics()[0].info.as_deref().expect("cycle path");
    assert!(info.contains("A") && info.contains("B"), "path: {info}");
}

#[test]
fn cross_module_constant_cycle_is_detected() {
    let (_, kinds) = compile_modules(&[
        ("a", "X :: main::Y + 1;\nimport main;"),
        ("main", &with_main("import a;\nY :: a::X + 1;")),
    ]);
    assert_eq!(kinds, vec![ErrorKind::ConstevalDependencyCycle]);
}

#[test]
fn division_and_remainder_by_zero() {
    assert_eq!(
        check_main(&with_main("X :: 1 / 0;")),
        vec![ErrorKind::ConstevalZeroDiv]
    );
    assert_eq!(
        check_main(&with_main("X :: 1 % 0;")),
        vec![ErrorKind::ConstevalZeroMod]
    );
}

#[test]
fn unsigned_overflow_in_folding() {
    let kinds = check_main(&with_main("X :: 18446744073709551615 + 1;"));
    assert_eq!(kinds, vec![ErrorKind::ConstevalIntOverflow]);
}

#[test]
fn enum_variant_values_are_range_checked() {
    let (program, kinds) = compile_modules(&[("main", &with_main("Flag :: enum :: u8 { A = 0; B = 255; }"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.enums[0].variants[1].value, Some(ConstValue::UInt(255)));

    let kinds = check_main(&with_main("Flag :: enum :: u8 { A = 256; }"));
    assert_eq!(kinds, vec![ErrorKind::ConstevalIntOutOfRange]);
}

#[test]
fn struct_field_default_must_match_field_type() {
    assert_eq!(check_main(&with_main("C :: struct { retries: i32 = 3; }")), vec![]);
    let kinds = check_main(&with_main("C :: struct { retries: i32 = 3.5; }"));
    assert_eq!(kinds, vec![ErrorKind::TypeMismatch]);
}

#[test]
fn sizeof_folds_in_constants() {
    let (program, kinds) = compile_modules(&[("main", &with_main("PTR :: sizeof(*u8);\nWORD :: sizeof(i32);"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[0].value, Some(ConstValue::UInt(8)));
    assert_eq!(program.globals[1].value, Some(ConstValue::UInt(4)));
}

#[test]
fn calls_and_locals_do_not_fold() {
    assert_eq!(
        check_main(&with_main("f :: () -> i32 { return 1; }\nX :: f();")),
        vec![ErrorKind::ConstProcIsNotConst]
    );
    assert_eq!(
        check_main(&with_main("Foo :: struct { x: i32; }\nX :: Foo;")),
        vec![ErrorKind::ConstVarIsNotGlobal]
    );
}

#[test]
fn bitwise_folding_is_unsigned_only() {
    let (program, kinds) = compile_modules(&[("main", &with_main("M :: 1 << 4;"))]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[0].value, Some(ConstValue::UInt(16)));

    let kinds = check_main(&with_main("M :: -1 << 4;"));
    assert_eq!(kinds, vec![ErrorKind::TypeMismatch]);
}

// ============================================================================
// Pass 5: control flow
// ============================================================================

#[test]
fn missing_return_on_some_path() {
    let kinds = check_main("main :: () -> i32 { if true { return 1; } }");
    assert_eq!(kinds, vec![ErrorKind::CfgNotAllPathsReturn]);
}

#[test]
fn if_else_returning_on_both_branches_terminates() {
    let kinds = check_main("main :: () -> i32 { if true { return 1; } else { return 0; } }");
    assert_eq!(kinds, vec![]);
}

#[test]
fn unreachable_statement_after_return() {
    let kinds = check_main("main :: () -> i32 { return 0; x: i32 = 1; }");
    assert_eq!(kinds, vec![ErrorKind::CfgUnreachableStatement]);
}

#[test]
fn defer_rules() {
    assert_eq!(
        check_main(&with_main("f :: () { defer { defer { return; } } }")),
        vec![ErrorKind::CfgNestedDefer]
    );
    assert_eq!(
        check_main(&with_main("f :: () { defer { return; } }")),
        vec![ErrorKind::CfgReturnInsideDefer]
    );
    assert_eq!(
        check_main(&with_main("f :: () { for i: i32 = 0; i < 3; i += 1 { defer break; } }")),
        vec![ErrorKind::CfgBreakInsideDefer]
    );
}

#[test]
fn break_and_continue_outside_loops() {
    assert_eq!(
        check_main(&with_main("f :: () { break; }")),
        vec![ErrorKind::CfgBreakOutsideLoop]
    );
    assert_eq!(
        check_main(&with_main("f :: () { continue; }")),
        vec![ErrorKind::CfgContinueOutsideLoop]
    );
}

#[test]
fn loops_allow_break_and_continue() {
    let kinds = check_main(&with_main("f :: () { for { break; } for i: i32 = 0; i < 3; i += 1 { continue; } }"));
    assert_eq!(kinds, vec![]);
}

#[test]
fn external_procs_skip_cfg_but_keep_signatures() {
    assert_eq!(check_main(&with_main("write :: (fd: i32) -> i64 @")), vec![]);
    assert_eq!(
        check_main(&with_main("write :: (fd: Missing) -> i64 @")),
        vec![ErrorKind::ResolveTypeNotFound]
    );
}

// ============================================================================
// Pass 5: types and resolution
// ============================================================================

#[test]
fn var_shadowing_is_forbidden() {
    let kinds = check_main(&with_main("f :: () { x: i32 = 1; { x: i32 = 2; } }"));
    assert_eq!(kinds, vec![ErrorKind::VarDeclAlreadyInScope]);
}

#[test]
fn var_leaves_scope_with_its_block() {
    let kinds = check_main(&with_main("f :: () { { x: i32 = 1; } x: i32 = 2; }"));
    assert_eq!(kinds, vec![]);
}

#[test]
fn local_cannot_reuse_global_name() {
    let kinds = check_main(&with_main("SIZE :: 8;\nf :: () { SIZE: i32 = 1; }"));
    assert_eq!(kinds, vec![ErrorKind::VarDeclAlreadyIsGlobal]);
}

#[test]
fn unknown_variable_is_reported() {
    let kinds = check_main(&with_main("f :: () { x: i32 = missing; }"));
    assert_eq!(kinds, vec![ErrorKind::VarLocalNotFound]);
}

#[test]
fn widening_is_implicit_same_kind_only() {
    assert_eq!(
        check_main(&with_main("f :: (a: i8) { b: i64 = a; }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: i64) { b: i32 = a; }")),
        vec![ErrorKind::TypeMismatch]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: f32) { b: i32 = a; }")),
        vec![ErrorKind::TypeMismatch]
    );
}

#[test]
fn return_expression_rules() {
    // A bare `return` still terminates the CFG; the type pass flags it.
    assert_eq!(
        check_main(&with_main("f :: () -> i32 { return; }")),
        vec![ErrorKind::ReturnExpectedExpr]
    );
    assert_eq!(
        check_main(&with_main("f :: () { return 1; }")),
        vec![ErrorKind::ReturnExpectedNoExpr]
    );
}

#[test]
fn if_condition_must_be_bool() {
    let kinds = check_main(&with_main("f :: (x: i32) { if x { return; } }"));
    assert_eq!(kinds, vec![ErrorKind::TypeMismatch]);
}

#[test]
fn switch_rules() {
    assert_eq!(
        check_main(&with_main("f :: (x: bool) { switch x { true: return; } }")),
        vec![ErrorKind::SwitchIncorrectExprType]
    );
    assert_eq!(
        check_main(&with_main("f :: (x: i32) { switch x { } }")),
        vec![ErrorKind::SwitchZeroCases]
    );
    assert_eq!(
        check_main(&with_main("f :: (x: i32) { switch x { 0: return; 1: return; } }")),
        vec![]
    );
}

#[test]
fn switch_on_enum_takes_enum_literal_cases() {
    let kinds = check_main(&with_main(
        "Color :: enum { Red = 0; Blue = 1; }\nf :: (c: Color) { switch c { .Red: return; .Blue: return; } }",
    ));
    assert_eq!(kinds, vec![]);

    let kinds = check_main(&with_main(
        "Color :: enum { Red = 0; }\nf :: (c: Color) { switch c { .Green: return; } }",
    ));
    assert_eq!(kinds, vec![ErrorKind::ResolveEnumVariantNotFound]);
}

#[test]
fn proc_call_checking() {
    assert_eq!(
        check_main(&with_main("f :: (a: i32) { return; }\ng :: () { f(1); }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: i32) { return; }\ng :: () { f(); }")),
        vec![ErrorKind::TypeMismatch]
    );
    assert_eq!(
        check_main(&with_main("g :: () { missing(); }")),
        vec![ErrorKind::ResolveProcNotFound]
    );
}

#[test]
fn variadic_callee_accepts_more_arguments() {
    let kinds = check_main(&with_main("log :: (level: i32, ..) @\nf :: () { log(1, 2, 3); }"));
    assert_eq!(kinds, vec![]);
}

#[test]
fn statement_call_must_not_return_a_value() {
    let kinds = check_main(&with_main("f :: () -> i32 { return 1; }\ng :: () { f(); }"));
    assert_eq!(kinds, vec![ErrorKind::TypeMismatch]);
}

#[test]
fn expression_call_must_return_a_value() {
    let kinds = check_main(&with_main("f :: () { return; }\ng :: () { x := f(); }"));
    assert_eq!(kinds, vec![ErrorKind::TypeMismatch]);
}

#[test]
fn field_access_resolves_through_one_pointer_level() {
    let source = "Vec2 :: struct { x: f32; y: f32; }\n\
                  by_value :: (v: Vec2) -> f32 { return v.x; }\n\
                  by_pointer :: (v: *Vec2) -> f32 { return v.x; }";
    assert_eq!(check_main(&with_main(source)), vec![]);

    let double = "Vec2 :: struct { x: f32; }\nf :: (v: **Vec2) -> f32 { return v.x; }";
    assert_eq!(check_main(&with_main(double)), vec![ErrorKind::TypeMismatch]);
}

#[test]
fn unknown_struct_field() {
    let kinds = check_main(&with_main(
        "Vec2 :: struct { x: f32; }\nf :: (v: Vec2) -> f32 { return v.z; }",
    ));
    assert_eq!(kinds, vec![ErrorKind::ResolveStructFieldNotFound]);
}

#[test]
fn array_indexing_rules() {
    assert_eq!(
        check_main(&with_main("f :: (a: [3]i32) -> i32 { return a[0]; }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: [3]i32) -> i32 { return a[1.5]; }")),
        vec![ErrorKind::TypeMismatch]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: i32) -> i32 { return a[0]; }")),
        vec![ErrorKind::TypeMismatch]
    );
}

#[test]
fn struct_and_array_initializers_follow_context() {
    let source = "Vec2 :: struct { x: f32; y: f32; }\n\
                  f :: () { v: Vec2 = .{1.0, 2.0}; a: [2]i32 = {1, 2}; }";
    assert_eq!(check_main(&with_main(source)), vec![]);

    assert_eq!(
        check_main(&with_main("f :: () { v := .{1, 2}; }")),
        vec![ErrorKind::ResolveStructNoContext]
    );
    assert_eq!(
        check_main(&with_main("f :: () { a := {1, 2}; }")),
        vec![ErrorKind::ResolveArrayNoContext]
    );
    assert_eq!(
        check_main(&with_main("f :: (x: i32) { v: i32 = .{1}; }")),
        vec![ErrorKind::ResolveStructWrongContext]
    );
}

#[test]
fn struct_initializer_field_counts() {
    let source = "C :: struct { a: i32; b: i32 = 7; }\nf :: () { c: C = .{1}; }";
    assert_eq!(check_main(&with_main(source)), vec![]);

    let missing = "C :: struct { a: i32; b: i32; }\nf :: () { c: C = .{1}; }";
    assert_eq!(check_main(&with_main(missing)), vec![ErrorKind::TypeMismatch]);
}

#[test]
fn impl_methods_resolve_on_struct_values() {
    let source = "Vec2 :: struct { x: f32; y: f32; }\n\
                  impl Vec2 {\n\
                    sum :: (self) -> f32 { return self.x + self.y; }\n\
                  }\n\
                  f :: (v: Vec2) -> f32 { return v.sum(); }";
    assert_eq!(check_main(&with_main(source)), vec![]);

    let missing = "Vec2 :: struct { x: f32; }\nf :: (v: Vec2) -> f32 { return v.norm(); }";
    assert_eq!(check_main(&with_main(missing)), vec![ErrorKind::ResolveProcNotFound]);
}

#[test]
fn cast_rules() {
    assert_eq!(
        check_main(&with_main("f :: (a: i32) { b := cast(i64, a); c := cast(f32, a); }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: i32) { b := cast(i32, a); }")),
        vec![ErrorKind::CastRedundantIntegerCast]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: f64) { b := cast(f64, a); }")),
        vec![ErrorKind::CastRedundantFloatCast]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: i32) { b := cast(bool, a); }")),
        vec![ErrorKind::CastIntoBoolBasicType]
    );
    assert_eq!(
        check_main(&with_main("f :: (a: bool) { b := cast(i32, a); }")),
        vec![ErrorKind::CastExprBoolBasicType]
    );
}

#[test]
fn cross_module_globals_and_procs() {
    let (_, kinds) = compile_modules(&[
        ("a", "SIZE :: 64;\nadd :: (x: i32, y: i32) -> i32 { return x + y; }"),
        (
            "main",
            "import a;\nmain :: () -> i32 { s: u64 = a::SIZE; return a::add(1, 2); }",
        ),
    ]);
    assert_eq!(kinds, vec![]);
}

#[test]
fn compound_assignment_rules() {
    assert_eq!(
        check_main(&with_main("f :: () { x: i32 = 0; x += 2; x *= 3; }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: () { x: u32 = 1; x <<= 2; }")),
        vec![]
    );
    assert_eq!(
        check_main(&with_main("f :: () { x: i32 = 1; x |= 2; }")),
        vec![ErrorKind::TypeMismatch]
    );
    assert_eq!(
        check_main(&with_main("f :: () { x: bool = true; x += true; }")),
        vec![ErrorKind::TypeMismatch]
    );
}
