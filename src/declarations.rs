//! Declaration index for a component's script.
//!
//! Collects every variable (destructured bindings included) and function
//! declaration at any nesting depth, in source order, together with the
//! script's import clauses. Lookup is flat: the first declaration with a
//! matching name wins, regardless of the block it was declared in.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Function, ImportDeclarationSpecifier, ModuleExportName, Statement,
    VariableDeclaration, VariableDeclarationKind,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;

use crate::lower::{property_key_name, TypeLowering};
use crate::types::{FunctionType, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub start: u32,
    pub end: u32,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedBinding {
    Default,
    Namespace,
    /// The exported name on the module side (`b` in `import { b as a }`).
    Named(String),
}

/// One binding introduced by an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportClause {
    pub local_name: String,
    pub imported: ImportedBinding,
    pub module_specifier: String,
    pub start: u32,
    pub end: u32,
}

/// Anything that binds a name: declarations, class members, import clauses.
pub trait NamedDeclaration {
    fn declaration_name(&self) -> &str;
}

impl NamedDeclaration for Declaration {
    fn declaration_name(&self) -> &str {
        &self.name
    }
}

impl NamedDeclaration for ImportClause {
    fn declaration_name(&self) -> &str {
        &self.local_name
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
    file_name: String,
    declarations: Vec<Declaration>,
    imports: Vec<ImportClause>,
}

impl ScriptScope {
    /// Parses `text` as a TypeScript module. Syntax errors are logged and the
    /// recovered AST is indexed.
    pub fn parse(file_name: &str, text: &str) -> Self {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_typescript(true)
            .with_module(true);
        let ret = Parser::new(&allocator, text, source_type).parse();

        if !ret.errors.is_empty() {
            tracing::warn!(
                file = file_name,
                errors = ret.errors.len(),
                first = ?ret.errors.first(),
                "script parsed with errors"
            );
        }

        let lowering = TypeLowering::new(&ret.program.body);
        let mut collector = DeclarationCollector {
            lowering: &lowering,
            declarations: Vec::new(),
        };
        collector.visit_program(&ret.program);

        let imports = collect_imports(&ret.program.body);

        tracing::trace!(
            file = file_name,
            declarations = collector.declarations.len(),
            imports = imports.len(),
            "indexed script scope"
        );

        Self {
            file_name: file_name.to_string(),
            declarations: collector.declarations,
            imports,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration_names(&self) -> Vec<&str> {
        self.declarations
            .iter()
            .map(NamedDeclaration::declaration_name)
            .collect()
    }

    pub fn declaration_by_name(&self, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|decl| decl.declaration_name() == name)
    }

    pub fn imports(&self) -> &[ImportClause] {
        &self.imports
    }
}

struct DeclarationCollector<'l, 's, 'a> {
    lowering: &'l TypeLowering<'s, 'a>,
    declarations: Vec<Declaration>,
}

impl<'l, 's, 'a> DeclarationCollector<'l, 's, 'a> {
    fn lookup(&self, name: &str) -> Option<Type> {
        self.declarations
            .iter()
            .find(|decl| decl.name == name)
            .map(|decl| decl.ty.clone())
    }

    fn bind_pattern(&mut self, pattern: &BindingPattern<'a>, ty: Type, kind: DeclarationKind) {
        match pattern {
            BindingPattern::BindingIdentifier(id) => {
                self.declarations.push(Declaration {
                    name: id.name.to_string(),
                    kind,
                    start: id.span.start,
                    end: id.span.end,
                    ty,
                });
            }
            BindingPattern::ObjectPattern(obj) => {
                for prop in &obj.properties {
                    let prop_ty = property_key_name(&prop.key)
                        .and_then(|name| ty.property_type(&name))
                        .unwrap_or(Type::Any);
                    self.bind_pattern(&prop.value, prop_ty, kind);
                }
                if let Some(rest) = &obj.rest {
                    self.bind_pattern(&rest.argument, Type::Any, kind);
                }
            }
            BindingPattern::ArrayPattern(arr) => {
                for (i, elem) in arr.elements.iter().enumerate() {
                    if let Some(elem) = elem {
                        let elem_ty = ty.element_type(i).unwrap_or(Type::Any);
                        self.bind_pattern(elem, elem_ty, kind);
                    }
                }
                if let Some(rest) = &arr.rest {
                    let rest_ty = match &ty {
                        Type::Array(elem) => Type::Array(elem.clone()),
                        _ => Type::Any,
                    };
                    self.bind_pattern(&rest.argument, rest_ty, kind);
                }
            }
            BindingPattern::AssignmentPattern(assign) => {
                let ty = if ty == Type::Any {
                    let lookup = |name: &str| self.lookup(name);
                    self.lowering.infer_expression(&assign.right, &lookup).widened()
                } else {
                    ty
                };
                self.bind_pattern(&assign.left, ty, kind);
            }
        }
    }
}

impl<'l, 's, 'a> Visit<'a> for DeclarationCollector<'l, 's, 'a> {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        let kind = match decl.kind {
            VariableDeclarationKind::Var => DeclarationKind::Var,
            VariableDeclarationKind::Const => DeclarationKind::Const,
            _ => DeclarationKind::Let,
        };

        for declarator in &decl.declarations {
            let ty = if let Some(annotation) = &declarator.type_annotation {
                self.lowering.lower_annotation(annotation)
            } else if let Some(init) = &declarator.init {
                let lookup = |name: &str| self.lookup(name);
                let inferred = self.lowering.infer_expression(init, &lookup);
                if kind == DeclarationKind::Const {
                    inferred
                } else {
                    inferred.widened()
                }
            } else {
                Type::Any
            };
            self.bind_pattern(&declarator.id, ty, kind);
        }

        walk::walk_variable_declaration(self, decl);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if func.is_declaration() {
            if let Some(id) = &func.id {
                let ret = func
                    .return_type
                    .as_ref()
                    .map(|ann| self.lowering.lower_annotation(ann))
                    .unwrap_or(Type::Any);
                self.declarations.push(Declaration {
                    name: id.name.to_string(),
                    kind: DeclarationKind::Function,
                    start: id.span.start,
                    end: id.span.end,
                    ty: Type::Function(FunctionType {
                        params: self.lowering.lower_function_params(&func.params),
                        ret: Box::new(ret),
                        method: false,
                    }),
                });
            }
        }
        walk::walk_function(self, func, flags);
    }
}

pub(crate) fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

/// Value imports in source order; each named specifier is its own clause.
/// Type-only imports cannot name a component and are skipped.
pub(crate) fn collect_imports(body: &[Statement]) -> Vec<ImportClause> {
    let mut imports = Vec::new();
    for stmt in body {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        if import.import_kind.is_type() {
            continue;
        }
        let Some(specifiers) = &import.specifiers else {
            continue;
        };
        let module_specifier = import.source.value.to_string();

        for specifier in specifiers {
            let (local, imported) = match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    (
                        &s.local,
                        ImportedBinding::Named(module_export_name(&s.imported)),
                    )
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    (&s.local, ImportedBinding::Default)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    (&s.local, ImportedBinding::Namespace)
                }
            };
            imports.push(ImportClause {
                local_name: local.name.to_string(),
                imported,
                module_specifier: module_specifier.clone(),
                start: local.span.start,
                end: local.span.end,
            });
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_in_source_order_at_any_depth() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            let count = 0;
            function increment(by: number): void {
                const next = count + by;
            }
            if (count) {
                var nested = "x";
            }
            "#,
        );
        assert_eq!(
            scope.declaration_names(),
            vec!["count", "increment", "next", "nested"]
        );
        assert_eq!(scope.file_name(), "App.svelte.ts");
        assert_eq!(scope.declaration_by_name("count").unwrap().ty, Type::Number);
        assert_eq!(
            scope.declaration_by_name("increment").unwrap().ty.to_string(),
            "(by: number) => void"
        );
    }

    #[test]
    fn test_annotations_use_local_types() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            interface User { name: string; age: number }
            type Maybe = User | null;
            let user: User;
            let maybe: Maybe = null;
            "#,
        );
        let user = scope.declaration_by_name("user").unwrap();
        let Type::Object(obj) = &user.ty else {
            panic!("expected object type, got {}", user.ty);
        };
        assert_eq!(obj.name.as_deref(), Some("User"));
        assert_eq!(
            scope.declaration_by_name("maybe").unwrap().ty.to_string(),
            "User | null"
        );
    }

    #[test]
    fn test_const_keeps_literal_let_widens() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            const size = "sm";
            let label = "hello";
            let copy = size;
            "#,
        );
        assert_eq!(
            scope.declaration_by_name("size").unwrap().ty,
            Type::StringLiteral("sm".to_string())
        );
        assert_eq!(scope.declaration_by_name("label").unwrap().ty, Type::String);
        assert_eq!(scope.declaration_by_name("copy").unwrap().ty, Type::String);
    }

    #[test]
    fn test_destructured_bindings() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            const settings: { theme: string; size: number } = { theme: "dark", size: 2 };
            const { theme, size: fontSize } = settings;
            const [first, , third = 3] = [1, 2];
            "#,
        );
        assert_eq!(
            scope.declaration_names(),
            vec!["settings", "theme", "fontSize", "first", "third"]
        );
        assert_eq!(scope.declaration_by_name("theme").unwrap().ty, Type::String);
        assert_eq!(scope.declaration_by_name("fontSize").unwrap().ty, Type::Number);
        assert_eq!(scope.declaration_by_name("first").unwrap().ty, Type::Number);
    }

    #[test]
    fn test_object_literal_inference() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"let user = { name: "Ada", admin: true };"#,
        );
        assert_eq!(
            scope.declaration_by_name("user").unwrap().ty.to_string(),
            "{ name: string; admin: boolean; }"
        );
    }

    #[test]
    fn test_first_match_wins() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            let value = 1;
            { let value = "shadow"; }
            "#,
        );
        assert_eq!(scope.declaration_by_name("value").unwrap().ty, Type::Number);
        assert_eq!(scope.declarations().len(), 2);
    }

    #[test]
    fn test_import_clauses() {
        let scope = ScriptScope::parse(
            "App.svelte.ts",
            r#"
            import Profile from "./Profile.svelte";
            import { Button as PrimaryButton, Card } from "./ui";
            import * as icons from "./icons";
            import type { User } from "./types";
            import "./global.css";
            "#,
        );
        let imports = scope.imports();
        let names: Vec<&str> = imports.iter().map(|i| i.declaration_name()).collect();
        assert_eq!(names, vec!["Profile", "PrimaryButton", "Card", "icons"]);
        assert_eq!(imports[0].imported, ImportedBinding::Default);
        assert_eq!(
            imports[1].imported,
            ImportedBinding::Named("Button".to_string())
        );
        assert_eq!(imports[1].module_specifier, "./ui");
        assert_eq!(imports[3].imported, ImportedBinding::Namespace);
    }
}
