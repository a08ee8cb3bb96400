//! End-to-end pipeline tests: lex → parse → all five checker passes, over
//! in-memory module sets.

use pretty_assertions::assert_eq;

use slate::frontend;
use slate::frontend::diagnostics::ErrorKind;
use slate::frontend::module::Session;
use slate::frontend::program::Program;
use slate::frontend::symbols::ConstValue;

fn compile(sources: &[(&str, &str)]) -> (Program, Vec<ErrorKind>) {
    let mut session = Session::from_sources(sources);
    let (program, reporter) = frontend::compile(&mut session);
    let kinds = reporter.diagnostics().iter().map(|diagnostic| diagnostic.kind).collect();
    (program, kinds)
}

#[test]
fn hello_main_compiles_cleanly() {
    let (program, kinds) = compile(&[("main", "main :: () -> i32 { return 0; }")]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.procs.len(), 1);
}

#[test]
fn duplicate_struct_halts_after_pass_1() {
    let source = "main :: () -> i32 { return 0; }\n\
                  Foo :: struct { x: i32; }\n\
                  Foo :: struct { x: i32; }";
    let (program, kinds) = compile(&[("main", source)]);
    assert_eq!(kinds, vec![ErrorKind::SymbolAlreadyDeclared]);
    // Pass 2 never ran, so no signature was resolved.
    assert!(program.procs.iter().all(|proc| proc.sig.is_none()));
}

#[test]
fn infinite_struct_is_reported_with_chain() {
    let source = "main :: () -> i32 { return 0; }\n\
                  Node :: struct { next: Node; }";
    let mut session = Session::from_sources(&[("main", source)]);
    let (_, reporter) = frontend::compile(&mut session);
    assert_eq!(reporter.count(), 1);
    let diagnostic = &reporter.diagnostics()[0];
    assert_eq!(diagnostic.kind, ErrorKind::StructInfiniteSize);
    assert_eq!(diagnostic.info.as_deref(), Some("field access path: next"));
}

#[test]
fn constant_cycle_is_reported() {
    let source = "main :: () -> i32 { return 0; }\n\
                  A :: B + 1;\n\
                  B :: A + 1;";
    let (_, kinds) = compile(&[("main", source)]);
    assert_eq!(kinds, vec![ErrorKind::ConstevalDependencyCycle]);
}

#[test]
fn missing_return_path_is_reported() {
    let source = "main :: () -> i32 { return 0; }\n\
                  f :: () -> i32 { if true { return 1; } }";
    let (_, kinds) = compile(&[("main", source)]);
    assert_eq!(kinds, vec![ErrorKind::CfgNotAllPathsReturn]);
}

#[test]
fn cross_module_use_shares_the_struct_identity() {
    let (program, kinds) = compile(&[
        ("a", "Vec :: struct { x: i32; y: i32; }"),
        (
            "main",
            "import a;\n\
             use V = a::Vec;\n\
             main :: () -> i32 {\n\
               v: V = .{1, 2};\n\
               w: a::Vec = v;\n\
               return v.x;\n\
             }",
        ),
    ]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.structs.len(), 1);
}

#[test]
fn whole_program_with_every_declaration_kind() {
    let math = "PI_TIMES_1000 :: 3141;\n\
                Vec2 :: struct { x: f32; y: f32; }\n\
                impl Vec2 {\n\
                  dot :: (self, other: Vec2) -> f32 {\n\
                    return self.x * other.x + self.y * other.y;\n\
                  }\n\
                }\n\
                Axis :: enum :: u8 { X = 0; Y = 1; }\n\
                scale :: (v: Vec2, by: f32) -> Vec2 {\n\
                  return Vec2.{v.x * by, v.y * by};\n\
                }";
    let main = "import math;\n\
                use Vec2 = math::Vec2;\n\
                use Axis = math::Axis;\n\
                puts :: (text: string) @\n\
                main :: () -> i32 {\n\
                  v: Vec2 = .{1.0, 2.0};\n\
                  w := math::scale(v, 2.0);\n\
                  d := v.dot(w);\n\
                  total: f32 = 0.0;\n\
                  for i: i32 = 0; i < 10; i += 1 {\n\
                    if i % 2 == 0 { continue; }\n\
                    total += d;\n\
                  }\n\
                  axis: Axis = .X;\n\
                  switch axis {\n\
                    .X: { total += 1.0; }\n\
                    .Y: { total -= 1.0; }\n\
                  }\n\
                  defer puts(\"done\");\n\
                  if total > 0.0 { return 1; }\n\
                  return 0;\n\
                }";
    let (program, kinds) = compile(&[("math", math), ("main", main)]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.structs.len(), 1);
    assert_eq!(program.enums.len(), 1);
    assert_eq!(program.globals.len(), 1);
    assert_eq!(program.globals[0].value, Some(ConstValue::UInt(3141)));
}

#[test]
fn diagnostics_follow_module_then_declaration_order() {
    let (_, kinds) = compile(&[
        ("a", "Dup :: struct { x: i32; }\nDup :: struct { x: i32; }"),
        ("main", "main :: () -> i32 { return 0; }\nAlso :: enum { }\nAlso :: enum { }"),
    ]);
    // Module `a` reports before `main`; within a module, declaration order.
    assert_eq!(
        kinds,
        vec![ErrorKind::SymbolAlreadyDeclared, ErrorKind::SymbolAlreadyDeclared]
    );
}

#[test]
fn nested_modules_use_path_names() {
    let (_, kinds) = compile(&[
        ("math/vec", "Vec2 :: struct { x: f32; y: f32; }"),
        (
            "main",
            "import math::vec;\nmain :: () -> i32 { v: vec::Vec2 = .{0.0, 0.0}; return 0; }",
        ),
    ]);
    assert_eq!(kinds, vec![]);
}

#[test]
fn parse_error_in_one_module_still_parses_the_others() {
    let (_, kinds) = compile(&[
        ("bad", "This is not slate"),
        ("main", "main :: () -> i32 { return 0 }"),
    ]);
    // Both modules report their own parse diagnostic; checking never runs.
    assert_eq!(kinds.len(), 2);
    assert!(kinds
        .iter()
        .all(|kind| matches!(kind, ErrorKind::ParseExpectedToken { .. })));
}

#[test]
fn folding_is_idempotent_through_shared_references() {
    // `B` and `C` both force `A`; the second evaluation hits the terminal
    // state and must produce the same value.
    let source = "main :: () -> i32 { return 0; }\n\
                  A :: 21;\n\
                  B :: A * 2;\n\
                  C :: A * 2;";
    let (program, kinds) = compile(&[("main", source)]);
    assert_eq!(kinds, vec![]);
    assert_eq!(program.globals[1].value, Some(ConstValue::UInt(42)));
    assert_eq!(program.globals[1].value, program.globals[2].value);
}

#[test]
fn exit_status_contract() {
    // Success: no diagnostics. Failure: at least one diagnostic recorded.
    let mut session = Session::from_sources(&[("main", "main :: () -> i32 { return 0; }")]);
    let (_, reporter) = frontend::compile(&mut session);
    assert!(!reporter.any_error());

    let mut session = Session::from_sources(&[("main", "main :: () -> i64 { return 0; }")]);
    let (_, reporter) = frontend::compile(&mut session);
    assert!(reporter.any_error());
}
