//! Evaluates the JavaScript that a CSS-module loader generates, without a JS engine.
//!
//! A loader turns `styles.css` into a small module along the lines of
//!
//! ```js
//! import * as i0 from "-!css-loader!./base.css";
//! const cssImports = [i0.$css];
//!
//! // module
//! export const $css = { id: module.id, content: ".a_x{}", imports: cssImports };
//! // exports
//! export const a = "a_x " + i0.base;
//! ```
//!
//! The bundler only needs the values such a module exports. This crate parses
//! the module with swc and interprets the small subset of the language these
//! modules are written in: literals, template literals, `+`, member access,
//! object and array literals, `import`/`export`, `require()`, `module.exports`.
//! There is no I/O, no timers and no access to the host: the only way out of
//! the sandbox is the [`ModuleResolver`] the caller supplies.
//!
//! Runtime errors follow JavaScript: reading a property of `undefined` is a
//! TypeError, an unknown identifier is a ReferenceError. A resolver that does
//! not know a module returns `None`, which the module observes as `undefined`.
//!
//! # Example
//!
//! ```
//! use css_module_sandbox::{Exports, Sandbox};
//!
//! let source = r#"export const title = "title_" + "abc";"#;
//! let resolver = |_: &str| -> Option<Exports> { None };
//! let exports = Sandbox::new(&resolver).run("title.css", source).unwrap();
//! assert_eq!(exports["title"], "title_abc");
//! ```

mod error;
mod interpreter;
mod resolver;
mod value;

pub use error::SandboxError;
pub use resolver::{Exports, ModuleResolver};

use interpreter::Interpreter;
use std::sync::Arc;
use swc_common::{FileName, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};

/// Configured entry point for evaluating one generated module.
pub struct Sandbox<'r> {
    resolver: &'r dyn ModuleResolver,
    module_id: u32,
}

impl<'r> Sandbox<'r> {
    /// Creates a sandbox whose imports are answered by `resolver`.
    pub fn new(resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            resolver,
            module_id: 0,
        }
    }

    /// Sets the value the module observes as `module.id`.
    pub fn module_id(mut self, id: u32) -> Self {
        self.module_id = id;
        self
    }

    /// Parses and runs `source` once, returning its exports.
    pub fn run(&self, filename: &str, source: &str) -> Result<Exports, SandboxError> {
        let module = parse_module(filename, source)?;
        Interpreter::new(self.resolver, self.module_id, filename).run(&module)
    }
}

fn parse_module(filename: &str, source: &str) -> Result<Module, SandboxError> {
    let cm: Arc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom(filename.to_string()).into(),
        source.to_string(),
    );

    let syntax = Syntax::Es(EsSyntax {
        jsx: false,
        ..Default::default()
    });
    let mut parser = Parser::new(syntax, StringInput::from(&*fm), None);
    let parse_error = |message: String| SandboxError::Parse {
        filename: filename.to_string(),
        message,
    };

    let module = parser
        .parse_module()
        .map_err(|e| parse_error(e.kind().msg().into_owned()))?;
    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(parse_error(error.kind().msg().into_owned()));
    }

    Ok(module)
}
