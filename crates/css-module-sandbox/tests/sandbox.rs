use css_module_sandbox::{Exports, Sandbox, SandboxError};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;
use smol_str::SmolStr;

fn no_imports(_: &str) -> Option<Exports> {
    None
}

fn exports_of(pairs: &[(&str, serde_json::Value)]) -> Exports {
    pairs
        .iter()
        .map(|(key, value)| (SmolStr::new(key), value.clone()))
        .collect()
}

const GENERATED: &str = r#"import * as i0 from "-!../css-loader/index.js!./base.css";
import { base } from "-!../css-loader/index.js!./base.css";
const cssImports = [i0.$css];
// module
export const $css = {
	 id: module.id,
	 content: ".used-hash{color:red}",
	 imports: cssImports
}
// exports
export const used = "used-hash " + base;
"#;

#[test]
fn evaluates_loader_output() {
    let resolver = |specifier: &str| {
        (specifier == "-!../css-loader/index.js!./base.css").then(|| {
            exports_of(&[
                ("$css", json!({ "id": 1, "content": ".base-hash{}" })),
                ("base", json!("base-hash")),
            ])
        })
    };
    let exports = Sandbox::new(&resolver)
        .module_id(7)
        .run("a.css", GENERATED)
        .unwrap();

    assert_eq!(
        exports.keys().map(SmolStr::as_str).collect::<Vec<_>>(),
        vec!["$css", "used"]
    );
    assert_eq!(
        exports["$css"],
        json!({
            "id": 7,
            "content": ".used-hash{color:red}",
            "imports": [{ "id": 1, "content": ".base-hash{}" }]
        })
    );
    assert_eq!(exports["used"], "used-hash base-hash");
}

#[test]
fn missing_import_fails_on_dereference() {
    let err = Sandbox::new(&no_imports).run("a.css", GENERATED).unwrap_err();
    assert_eq!(
        err,
        SandboxError::Type("Cannot read properties of undefined (reading '$css')".into())
    );
}

#[test]
fn reexport_of_missing_module_fails() {
    let source = r#"export * from "./b.css"; export const a = "a";"#;
    let err = Sandbox::new(&no_imports).run("a.css", source).unwrap_err();
    assert_eq!(
        err,
        SandboxError::Type("Cannot convert undefined to object".into())
    );
}

#[test]
fn unused_named_import_is_lazy() {
    let source = r#"
        import { missing } from "./not-compiled.css";
        export const a = "a-hash";
    "#;
    let exports = Sandbox::new(&no_imports).run("a.css", source).unwrap();
    assert_eq!(exports, exports_of(&[("a", json!("a-hash"))]));
}

#[test]
fn commonjs_exports() {
    let source = r#"
        exports = module.exports = require("../css-loader/lib/css-base.js")(false);
    "#;
    // Calling the css-base runtime is outside the subset.
    let resolver = |_: &str| Some(Exports::new());
    let err = Sandbox::new(&resolver).run("a.css", source).unwrap_err();
    assert!(matches!(err, SandboxError::Type(_)), "{err}");

    let source = r#"
        var base = require("./base.css");
        exports.push = [1, "x"];
        module.exports.title = "title-hash " + base.title;
        exports.locals = { "a-b": "a-b-hash", c: `c-${1 + 1}` };
    "#;
    let resolver = |_: &str| Some(exports_of(&[("title", json!("base-title"))]));
    let exports = Sandbox::new(&resolver).run("a.css", source).unwrap();
    assert_eq!(
        exports,
        exports_of(&[
            ("push", json!([1, "x"])),
            ("title", json!("title-hash base-title")),
            ("locals", json!({ "a-b": "a-b-hash", "c": "c-2" })),
        ])
    );
}

#[test]
fn export_forms() {
    let source = r#"
        import def from "./def.css";
        const a = "a-hash", b = `b-hash\tx`;
        let list = [];
        list.push("one", ...["two"]);
        export { a, b as renamed };
        export { shared as reexported } from "./def.css";
        export * from "./def.css";
        export default { ...def, list, kind: typeof nothing };
    "#;
    let resolver = |_: &str| {
        Some(exports_of(&[
            ("default", json!({ "d": "d-hash" })),
            ("shared", json!("shared-hash")),
        ]))
    };
    let exports = Sandbox::new(&resolver).run("a.css", source).unwrap();
    assert_eq!(exports["reexported"], "shared-hash");
    assert_eq!(exports["shared"], "shared-hash");
    assert_eq!(
        exports["default"],
        json!({ "d": "d-hash", "list": ["one", "two"], "kind": "undefined" })
    );
    assert_eq!(exports["a"], "a-hash");
    assert_eq!(exports["renamed"], "b-hash\tx");
}

#[test]
fn undeclared_identifier_is_reference_error() {
    let err = Sandbox::new(&no_imports)
        .run("a.css", "export const a = window.location;")
        .unwrap_err();
    assert_eq!(err, SandboxError::Reference("window".into()));
    assert_eq!(err.to_string(), "ReferenceError: window is not defined");
}

#[test]
fn rejects_unsupported_constructs() {
    for source in [
        "export function f() {}",
        "while (true) {}",
        "export const a = (() => 1)();",
        "export const a = 1 * 2;",
    ] {
        let err = Sandbox::new(&no_imports).run("a.css", source).unwrap_err();
        assert!(matches!(err, SandboxError::Unsupported(_)), "{source}: {err}");
    }
}

#[test]
fn syntax_error_names_the_file() {
    let err = Sandbox::new(&no_imports)
        .run("broken.css", "export const = ;")
        .unwrap_err();
    assert!(matches!(err, SandboxError::Parse { ref filename, .. } if filename == "broken.css"));
}

#[test]
fn template_escapes() {
    let source = r#"export const t = `\x41\u{42}\u0043\t${"x"}\``;"#;
    let exports = Sandbox::new(&no_imports).run("a.css", source).unwrap();
    assert_eq!(exports["t"], "ABC\tx`");

    let err = Sandbox::new(&no_imports)
        .run("bad.css", r#"export const t = `\u{41`;"#)
        .unwrap_err();
    assert!(matches!(err, SandboxError::Parse { ref filename, .. } if filename == "bad.css"));
}

#[test]
fn run_is_repeatable() {
    let source = r#"export const a = "x" + module.id;"#;
    let sandbox = Sandbox::new(&no_imports).module_id(3);
    let first = sandbox.run("a.css", source).unwrap();
    let second = sandbox.run("a.css", source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, IndexMap::from([(SmolStr::new("a"), json!("x3"))]));
}
