//! Tree-walking evaluator for the module subset loaders emit.

use crate::error::SandboxError;
use crate::resolver::{Exports, ModuleResolver};
use crate::value::{
    add, member_get, member_set, spread_into_array, spread_into_object, Builtin, ObjectRef, Value,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;
use swc_ecma_ast::*;

/// What an identifier in module scope refers to.
#[derive(Debug, Clone)]
enum Binding {
    Value(Value),
    /// `import { name } from "..."`: read from the namespace on every use.
    Named { namespace: usize, name: SmolStr },
    /// `import name from "..."`.
    Default { namespace: usize },
}

pub(crate) struct Interpreter<'r> {
    resolver: &'r dyn ModuleResolver,
    module: ObjectRef,
    bindings: FxHashMap<SmolStr, Binding>,
    namespaces: Vec<Value>,
    /// `export { local as exported }` pairs, resolved once the body has run.
    local_exports: Vec<(SmolStr, SmolStr)>,
    filename: String,
}

impl<'r> Interpreter<'r> {
    pub(crate) fn new(resolver: &'r dyn ModuleResolver, module_id: u32, filename: &str) -> Self {
        let exports = Value::new_object(IndexMap::new());
        let module = IndexMap::from([
            (SmolStr::new_static("id"), Value::Number(f64::from(module_id))),
            (SmolStr::new_static("exports"), exports.clone()),
        ]);
        // `exports` starts out as an alias of `module.exports`.
        let mut bindings = FxHashMap::default();
        bindings.insert(SmolStr::new_static("exports"), Binding::Value(exports));
        Self {
            resolver,
            module: Rc::new(RefCell::new(module)),
            bindings,
            namespaces: Vec::new(),
            local_exports: Vec::new(),
            filename: filename.to_string(),
        }
    }

    /// Runs the module body once and returns `module.exports`.
    pub(crate) fn run(mut self, module: &Module) -> Result<Exports, SandboxError> {
        // Imports are hoisted above the body.
        for item in &module.body {
            if let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item {
                self.import(import)?;
            }
        }

        for item in &module.body {
            match item {
                ModuleItem::ModuleDecl(decl) => self.module_decl(decl)?,
                ModuleItem::Stmt(stmt) => self.stmt(stmt)?,
            }
        }

        for (local, exported) in std::mem::take(&mut self.local_exports) {
            let value = self.read_identifier(&local)?;
            self.export(exported, value)?;
        }

        self.finish()
    }

    fn finish(self) -> Result<Exports, SandboxError> {
        let exports = self
            .module
            .borrow()
            .get("exports")
            .cloned()
            .unwrap_or(Value::Undefined);
        let mut out = Exports::new();
        match exports {
            Value::Object(object) => {
                for (key, value) in object.borrow().iter() {
                    if let Some(json) = value.to_json()? {
                        out.insert(key.clone(), json);
                    }
                }
            }
            Value::Undefined | Value::Null => {}
            other => {
                // A CommonJS module may replace `module.exports` with a primitive.
                if let Some(json) = other.to_json()? {
                    out.insert(SmolStr::new_static("default"), json);
                }
            }
        }
        Ok(out)
    }

    fn resolve(&self, specifier: &Str) -> Value {
        let specifier = specifier.value.to_string_lossy();
        match self.resolver.resolve(&specifier) {
            Some(exports) => Value::from_exports(exports),
            None => {
                tracing::trace!(%specifier, "import not available yet");
                Value::Undefined
            }
        }
    }

    fn import(&mut self, import: &ImportDecl) -> Result<(), SandboxError> {
        let namespace = self.namespaces.len();
        let value = self.resolve(&import.src);
        self.namespaces.push(value.clone());

        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Namespace(star) => {
                    self.declare(&star.local.sym, Binding::Value(value.clone()));
                }
                ImportSpecifier::Default(default) => {
                    self.declare(&default.local.sym, Binding::Default { namespace });
                }
                ImportSpecifier::Named(named) => {
                    let name = match &named.imported {
                        Some(imported) => export_name(imported),
                        None => SmolStr::new(&*named.local.sym),
                    };
                    self.declare(&named.local.sym, Binding::Named { namespace, name });
                }
            }
        }
        Ok(())
    }

    fn module_decl(&mut self, decl: &ModuleDecl) -> Result<(), SandboxError> {
        match decl {
            ModuleDecl::Import(_) => {}
            ModuleDecl::ExportDecl(export) => match &export.decl {
                Decl::Var(var) => {
                    for name in self.var_decl(var)? {
                        let value = self.read_identifier(&name)?;
                        self.export(name, value)?;
                    }
                }
                _ => return Err(unsupported("exported function or class declaration")),
            },
            ModuleDecl::ExportNamed(named) => {
                let source = named.src.as_ref().map(|src| self.resolve(src));
                for specifier in &named.specifiers {
                    match (specifier, &source) {
                        (ExportSpecifier::Named(spec), None) => {
                            let local = export_name(&spec.orig);
                            let exported = spec.exported.as_ref().map(export_name);
                            self.local_exports
                                .push((local.clone(), exported.unwrap_or(local)));
                        }
                        (ExportSpecifier::Named(spec), Some(namespace)) => {
                            let orig = export_name(&spec.orig);
                            let exported = spec.exported.as_ref().map(export_name);
                            let value = member_get(namespace, &orig)?;
                            self.export(exported.unwrap_or(orig), value)?;
                        }
                        (ExportSpecifier::Namespace(spec), Some(namespace)) => {
                            self.export(export_name(&spec.name), namespace.clone())?;
                        }
                        _ => return Err(unsupported("export specifier")),
                    }
                }
            }
            ModuleDecl::ExportAll(all) => match self.resolve(&all.src) {
                Value::Object(source) => {
                    let entries: Vec<(SmolStr, Value)> = source
                        .borrow()
                        .iter()
                        .filter(|(key, _)| key.as_str() != "default")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    for (key, value) in entries {
                        self.export(key, value)?;
                    }
                }
                // Enumerating the keys of a missing module throws.
                other => {
                    return Err(SandboxError::Type(format!(
                        "Cannot convert {} to object",
                        other.to_js_string()
                    )))
                }
            },
            ModuleDecl::ExportDefaultExpr(default) => {
                let value = self.expr(&default.expr)?;
                self.export(SmolStr::new_static("default"), value)?;
            }
            _ => return Err(unsupported("module declaration")),
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), SandboxError> {
        match stmt {
            Stmt::Empty(_) => {}
            Stmt::Expr(expr) => {
                self.expr(&expr.expr)?;
            }
            Stmt::Decl(Decl::Var(var)) => {
                self.var_decl(var)?;
            }
            Stmt::Block(block) => {
                for stmt in &block.stmts {
                    self.stmt(stmt)?;
                }
            }
            _ => return Err(unsupported("statement")),
        }
        Ok(())
    }

    /// Evaluates a declaration and returns the names it bound.
    fn var_decl(&mut self, var: &VarDecl) -> Result<Vec<SmolStr>, SandboxError> {
        let mut names = Vec::with_capacity(var.decls.len());
        for declarator in &var.decls {
            let Pat::Ident(binding) = &declarator.name else {
                return Err(unsupported("destructuring declaration"));
            };
            let value = match &declarator.init {
                Some(init) => self.expr(init)?,
                None => Value::Undefined,
            };
            self.declare(&binding.id.sym, Binding::Value(value));
            names.push(SmolStr::new(&*binding.id.sym));
        }
        Ok(names)
    }

    fn declare(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(SmolStr::new(name), binding);
    }

    /// Adds `name` to `module.exports`.
    fn export(&mut self, name: SmolStr, value: Value) -> Result<(), SandboxError> {
        let exports = self.exports_object();
        member_set(&exports, name, value)
    }

    fn exports_object(&self) -> Value {
        self.module
            .borrow()
            .get("exports")
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    fn read_identifier(&self, name: &str) -> Result<Value, SandboxError> {
        if let Some(binding) = self.bindings.get(name) {
            return match binding {
                Binding::Value(value) => Ok(value.clone()),
                Binding::Named { namespace, name } => member_get(&self.namespaces[*namespace], name),
                Binding::Default { namespace } => {
                    let namespace = &self.namespaces[*namespace];
                    match namespace {
                        Value::Undefined => Ok(Value::Undefined),
                        Value::Object(object) => Ok(object
                            .borrow()
                            .get("default")
                            .cloned()
                            .unwrap_or_else(|| namespace.clone())),
                        other => Ok(other.clone()),
                    }
                }
            };
        }

        match name {
            "module" => Ok(Value::Object(self.module.clone())),
            "require" => Ok(Value::Function(Builtin::Require)),
            "undefined" => Ok(Value::Undefined),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => Err(SandboxError::Reference(name.to_string())),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<Value, SandboxError> {
        match expr {
            Expr::Lit(lit) => lit_value(lit),
            Expr::Tpl(tpl) => self.template(tpl),
            Expr::Ident(ident) => self.read_identifier(&ident.sym),
            Expr::Paren(paren) => self.expr(&paren.expr),
            Expr::Seq(seq) => {
                let mut last = Value::Undefined;
                for expr in &seq.exprs {
                    last = self.expr(expr)?;
                }
                Ok(last)
            }
            Expr::Member(member) => {
                let object = self.expr(&member.obj)?;
                let key = self.member_key(&member.prop)?;
                member_get(&object, &key)
            }
            Expr::Object(object) => self.object(object),
            Expr::Array(array) => {
                let mut items = Vec::with_capacity(array.elems.len());
                for element in &array.elems {
                    match element {
                        None => items.push(Value::Undefined),
                        Some(ExprOrSpread {
                            spread: Some(_),
                            expr,
                        }) => {
                            let value = self.expr(expr)?;
                            spread_into_array(&mut items, value)?;
                        }
                        Some(ExprOrSpread { spread: None, expr }) => items.push(self.expr(expr)?),
                    }
                }
                Ok(Value::new_array(items))
            }
            Expr::Bin(bin) => self.binary(bin),
            Expr::Cond(cond) => {
                if self.expr(&cond.test)?.is_truthy() {
                    self.expr(&cond.cons)
                } else {
                    self.expr(&cond.alt)
                }
            }
            Expr::Unary(unary) => self.unary(unary),
            Expr::Assign(assign) => self.assign(assign),
            Expr::Call(call) => self.call(call),
            _ => Err(unsupported("expression")),
        }
    }

    fn template(&mut self, tpl: &Tpl) -> Result<Value, SandboxError> {
        let mut out = String::new();
        for (i, quasi) in tpl.quasis.iter().enumerate() {
            let cooked = quasi.cooked.as_ref().ok_or_else(|| SandboxError::Parse {
                filename: self.filename.clone(),
                message: "invalid escape sequence in template literal".to_string(),
            })?;
            out.push_str(&cooked.to_string_lossy());
            if let Some(expr) = tpl.exprs.get(i) {
                out.push_str(&self.expr(expr)?.to_js_string());
            }
        }
        Ok(Value::String(out))
    }

    fn member_key(&mut self, prop: &MemberProp) -> Result<SmolStr, SandboxError> {
        match prop {
            MemberProp::Ident(ident) => Ok(SmolStr::new(&*ident.sym)),
            MemberProp::Computed(computed) => Ok(self.expr(&computed.expr)?.to_key()),
            MemberProp::PrivateName(_) => Err(unsupported("private name")),
        }
    }

    fn object(&mut self, object: &ObjectLit) -> Result<Value, SandboxError> {
        let mut entries = IndexMap::with_capacity(object.props.len());
        for prop in &object.props {
            match prop {
                PropOrSpread::Spread(spread) => {
                    let value = self.expr(&spread.expr)?;
                    spread_into_object(&mut entries, value);
                }
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::Shorthand(ident) => {
                        let value = self.read_identifier(&ident.sym)?;
                        entries.insert(SmolStr::new(&*ident.sym), value);
                    }
                    Prop::KeyValue(kv) => {
                        let key = self.prop_name(&kv.key)?;
                        let value = self.expr(&kv.value)?;
                        entries.insert(key, value);
                    }
                    _ => return Err(unsupported("object method or accessor")),
                },
            }
        }
        Ok(Value::new_object(entries))
    }

    fn prop_name(&mut self, name: &PropName) -> Result<SmolStr, SandboxError> {
        match name {
            PropName::Ident(ident) => Ok(SmolStr::new(&*ident.sym)),
            PropName::Str(s) => Ok(SmolStr::new(s.value.to_string_lossy())),
            PropName::Num(n) => Ok(Value::Number(n.value).to_key()),
            PropName::Computed(computed) => Ok(self.expr(&computed.expr)?.to_key()),
            PropName::BigInt(_) => Err(unsupported("bigint property name")),
        }
    }

    fn binary(&mut self, bin: &BinExpr) -> Result<Value, SandboxError> {
        match bin.op {
            BinaryOp::LogicalOr => {
                let left = self.expr(&bin.left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.expr(&bin.right)
                }
            }
            BinaryOp::LogicalAnd => {
                let left = self.expr(&bin.left)?;
                if left.is_truthy() {
                    self.expr(&bin.right)
                } else {
                    Ok(left)
                }
            }
            BinaryOp::Add => {
                let left = self.expr(&bin.left)?;
                let right = self.expr(&bin.right)?;
                Ok(add(&left, &right))
            }
            _ => Err(unsupported("binary operator")),
        }
    }

    fn unary(&mut self, unary: &UnaryExpr) -> Result<Value, SandboxError> {
        if unary.op == UnaryOp::TypeOf {
            if let Expr::Ident(ident) = &*unary.arg {
                return match self.read_identifier(&ident.sym) {
                    Ok(value) => Ok(Value::String(value.type_of().into())),
                    Err(SandboxError::Reference(_)) => Ok(Value::String("undefined".into())),
                    Err(e) => Err(e),
                };
            }
        }

        let value = self.expr(&unary.arg)?;
        match unary.op {
            UnaryOp::Void => Ok(Value::Undefined),
            UnaryOp::Minus => Ok(Value::Number(-value.to_number())),
            UnaryOp::Plus => Ok(Value::Number(value.to_number())),
            UnaryOp::Bang => Ok(Value::Bool(!value.is_truthy())),
            UnaryOp::TypeOf => Ok(Value::String(value.type_of().into())),
            _ => Err(unsupported("unary operator")),
        }
    }

    fn assign(&mut self, assign: &AssignExpr) -> Result<Value, SandboxError> {
        if assign.op != AssignOp::Assign {
            return Err(unsupported("compound assignment"));
        }

        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                let name = &*binding.id.sym;
                let value = self.expr(&assign.right)?;
                if !self.bindings.contains_key(name) {
                    return Err(SandboxError::Reference(name.to_string()));
                }
                self.declare(name, Binding::Value(value.clone()));
                Ok(value)
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                let object = self.expr(&member.obj)?;
                let key = self.member_key(&member.prop)?;
                let value = self.expr(&assign.right)?;
                member_set(&object, key, value.clone())?;
                Ok(value)
            }
            _ => Err(unsupported("assignment target")),
        }
    }

    fn call(&mut self, call: &CallExpr) -> Result<Value, SandboxError> {
        let Callee::Expr(callee) = &call.callee else {
            return Err(unsupported("super or dynamic import call"));
        };

        // Method call: only `array.push(...)` is understood.
        if let Expr::Member(member) = &**callee {
            let object = self.expr(&member.obj)?;
            let key = self.member_key(&member.prop)?;
            let method = member_get(&object, &key)?;
            return match (&object, key.as_str()) {
                (Value::Array(items), "push") => {
                    let args = self.arguments(&call.args)?;
                    let mut items = items.borrow_mut();
                    items.extend(args);
                    Ok(Value::Number(items.len() as f64))
                }
                _ => Err(not_a_function(&key, &method)),
            };
        }

        let function = self.expr(callee)?;
        match function {
            Value::Function(Builtin::Require) => {
                let args = self.arguments(&call.args)?;
                let specifier = args.first().cloned().unwrap_or(Value::Undefined);
                let specifier = specifier.to_js_string();
                match self.resolver.resolve(&specifier) {
                    Some(exports) => Ok(Value::from_exports(exports)),
                    None => Ok(Value::Undefined),
                }
            }
            other => {
                let name = match &**callee {
                    Expr::Ident(ident) => ident.sym.to_string(),
                    _ => "expression".to_string(),
                };
                Err(not_a_function(&name, &other))
            }
        }
    }

    fn arguments(&mut self, args: &[ExprOrSpread]) -> Result<Vec<Value>, SandboxError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.expr(&arg.expr)?;
            if arg.spread.is_some() {
                spread_into_array(&mut values, value)?;
            } else {
                values.push(value);
            }
        }
        Ok(values)
    }
}

fn lit_value(lit: &Lit) -> Result<Value, SandboxError> {
    match lit {
        Lit::Str(s) => Ok(Value::String(s.value.to_string_lossy().into_owned())),
        Lit::Num(n) => Ok(Value::Number(n.value)),
        Lit::Bool(b) => Ok(Value::Bool(b.value)),
        Lit::Null(_) => Ok(Value::Null),
        _ => Err(unsupported("literal")),
    }
}

fn export_name(name: &ModuleExportName) -> SmolStr {
    match name {
        ModuleExportName::Ident(ident) => SmolStr::new(&*ident.sym),
        ModuleExportName::Str(s) => SmolStr::new(s.value.to_string_lossy()),
    }
}

fn unsupported(what: &str) -> SandboxError {
    SandboxError::Unsupported(what.to_string())
}

fn not_a_function(name: &str, value: &Value) -> SandboxError {
    match value {
        Value::Undefined => SandboxError::Type(format!("{name} is not a function")),
        other => SandboxError::Type(format!("{name} ({}) is not a function", other.type_of())),
    }
}
