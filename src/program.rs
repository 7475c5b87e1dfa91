//! Declaration modules and import resolution.
//!
//! A [`Program`] holds the TypeScript declaration files (`.d.ts`/`.ts`) that
//! describe components, typically the `Foo.svelte.d.ts` files emitted next to
//! each compiled component. Modules are summarised eagerly when added: their
//! classes (with lowered member types) and their export table. Resolving an
//! import then only walks summaries.

use std::collections::HashMap;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Class, ClassElement, Declaration as AstDeclaration, ExportDefaultDeclarationKind, Expression,
    MethodDefinitionKind, Statement, TSAccessibility,
};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::declarations::{
    collect_imports, module_export_name, ImportClause, ImportedBinding, NamedDeclaration,
};
use crate::lower::{property_key_name, TypeLowering};
use crate::types::{optional_type, FunctionType, ObjectType, Property, Type};

const MAX_EXPORT_DEPTH: u32 = 16;

/// Base classes whose first type argument describes the component's props.
const SVELTE_COMPONENT_BASES: &[&str] = &[
    "SvelteComponent",
    "SvelteComponentTyped",
    "SvelteComponentDev",
];

/// Resolves import clauses to the component class they ultimately name.
pub trait TypeHost {
    fn resolve_import(
        &self,
        import: &ImportClause,
        containing_file: &str,
    ) -> Option<ComponentDeclaration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Accessor,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub ty: Type,
    pub optional: bool,
}

impl Member {
    /// Optional members also accept `undefined`.
    pub fn declared_type(&self) -> Type {
        optional_type(&self.ty, self.optional)
    }
}

impl NamedDeclaration for Member {
    fn declaration_name(&self) -> &str {
        &self.name
    }
}

/// A component's class declaration as seen through its declaration module.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDeclaration {
    pub name: String,
    pub file: String,
    pub start: u32,
    pub end: u32,
    pub members: Vec<Member>,
}

impl ComponentDeclaration {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.declaration_name().to_string())
            .collect()
    }

    /// The props-bearing view of an instance: every non-method member.
    pub fn instance_type(&self) -> Type {
        let properties = self
            .members
            .iter()
            .filter(|m| m.kind != MemberKind::Method)
            .map(|m| Property {
                name: m.name.clone(),
                ty: m.ty.clone(),
                optional: m.optional,
            })
            .collect();
        Type::Object(ObjectType {
            name: Some(self.name.clone()),
            properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExportTarget {
    /// A binding declared or imported in the exporting module.
    Local(String),
    /// `export { x as y } from "./m"`.
    ReExport {
        specifier: String,
        binding: ImportedBinding,
    },
}

#[derive(Debug, Default)]
struct ModuleSummary {
    classes: Vec<ComponentDeclaration>,
    default_export: Option<ExportTarget>,
    named_exports: Vec<(String, ExportTarget)>,
    star_exports: Vec<String>,
    imports: Vec<ImportClause>,
}

impl ModuleSummary {
    fn class(&self, name: &str) -> Option<&ComponentDeclaration> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Default)]
pub struct Program {
    modules: HashMap<String, ModuleSummary>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and summarises a module. Re-adding a file replaces it.
    pub fn add_module(&mut self, file: impl Into<String>, text: &str) {
        let file = normalize_path(&file.into());
        let summary = summarize_module(&file, text);
        tracing::debug!(
            file = %file,
            classes = summary.classes.len(),
            "added declaration module"
        );
        self.modules.insert(file, summary);
    }

    pub fn has_module(&self, file: &str) -> bool {
        self.modules.contains_key(&normalize_path(file))
    }

    /// File name a module specifier refers to from `containing_file`, if it
    /// is one of the program's modules.
    pub fn resolve_module_name(&self, specifier: &str, containing_file: &str) -> Option<String> {
        let base = if specifier.starts_with("./") || specifier.starts_with("../") {
            let dir = match containing_file.rfind('/') {
                Some(i) => &containing_file[..i],
                None => "",
            };
            if dir.is_empty() {
                normalize_path(specifier)
            } else {
                normalize_path(&format!("{}/{}", dir, specifier))
            }
        } else {
            normalize_path(specifier)
        };

        let candidates = [
            base.clone(),
            format!("{}.d.ts", base),
            format!("{}.ts", base),
            format!("{}/index.d.ts", base),
            format!("{}/index.ts", base),
        ];
        candidates
            .into_iter()
            .find(|candidate| self.modules.contains_key(candidate))
    }

    fn resolve_binding(
        &self,
        file: &str,
        binding: &ImportedBinding,
        depth: u32,
    ) -> Option<ComponentDeclaration> {
        if depth > MAX_EXPORT_DEPTH {
            tracing::warn!(file, "export resolution exceeded depth limit");
            return None;
        }
        let module = self.modules.get(file)?;

        match binding {
            ImportedBinding::Namespace => None,
            ImportedBinding::Default => {
                let target = module.default_export.as_ref()?;
                self.resolve_target(file, module, target, depth)
            }
            ImportedBinding::Named(name) => {
                if let Some((_, target)) = module
                    .named_exports
                    .iter()
                    .find(|(exported, _)| exported == name)
                {
                    return self.resolve_target(file, module, target, depth);
                }
                module.star_exports.iter().find_map(|specifier| {
                    let next = self.resolve_module_name(specifier, file)?;
                    self.resolve_binding(&next, binding, depth + 1)
                })
            }
        }
    }

    fn resolve_target(
        &self,
        file: &str,
        module: &ModuleSummary,
        target: &ExportTarget,
        depth: u32,
    ) -> Option<ComponentDeclaration> {
        match target {
            ExportTarget::Local(name) => {
                if let Some(class) = module.class(name) {
                    return Some(class.clone());
                }
                let import = module.imports.iter().find(|i| &i.local_name == name)?;
                let next = self.resolve_module_name(&import.module_specifier, file)?;
                self.resolve_binding(&next, &import.imported, depth + 1)
            }
            ExportTarget::ReExport { specifier, binding } => {
                let next = self.resolve_module_name(specifier, file)?;
                self.resolve_binding(&next, binding, depth + 1)
            }
        }
    }
}

impl TypeHost for Program {
    fn resolve_import(
        &self,
        import: &ImportClause,
        containing_file: &str,
    ) -> Option<ComponentDeclaration> {
        let file = self.resolve_module_name(&import.module_specifier, containing_file)?;
        self.resolve_binding(&file, &import.imported, 0)
    }
}

/// Collapses `.` and `..` segments. Leading `..` that cannot be collapsed are
/// kept.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

fn summarize_module(file: &str, text: &str) -> ModuleSummary {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_typescript_definition(file.ends_with(".d.ts"))
        .with_module(true);
    let ret = Parser::new(&allocator, text, source_type).parse();
    if !ret.errors.is_empty() {
        tracing::warn!(
            file,
            errors = ret.errors.len(),
            first = ?ret.errors.first(),
            "declaration module parsed with errors"
        );
    }

    let body = &ret.program.body;
    let lowering = TypeLowering::new(body);
    let mut summary = ModuleSummary {
        imports: collect_imports(body),
        ..Default::default()
    };

    for stmt in body {
        match stmt {
            Statement::ClassDeclaration(class) => {
                if let Some(decl) = summarize_class(file, class, None, &lowering) {
                    summary.classes.push(decl);
                }
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(AstDeclaration::ClassDeclaration(class)) = &export.declaration {
                    if let Some(decl) = summarize_class(file, class, None, &lowering) {
                        summary
                            .named_exports
                            .push((decl.name.clone(), ExportTarget::Local(decl.name.clone())));
                        summary.classes.push(decl);
                    }
                    continue;
                }
                let source = export.source.as_ref().map(|s| s.value.to_string());
                for specifier in &export.specifiers {
                    let local = module_export_name(&specifier.local);
                    let exported = module_export_name(&specifier.exported);
                    let target = match &source {
                        Some(specifier) => ExportTarget::ReExport {
                            specifier: specifier.clone(),
                            binding: if local == "default" {
                                ImportedBinding::Default
                            } else {
                                ImportedBinding::Named(local)
                            },
                        },
                        None => ExportTarget::Local(local),
                    };
                    if exported == "default" {
                        summary.default_export = Some(target);
                    } else {
                        summary.named_exports.push((exported, target));
                    }
                }
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    if let Some(decl) = summarize_class(file, class, Some("default"), &lowering) {
                        summary.default_export = Some(ExportTarget::Local(decl.name.clone()));
                        summary.classes.push(decl);
                    }
                }
                ExportDefaultDeclarationKind::Identifier(id) => {
                    summary.default_export = Some(ExportTarget::Local(id.name.to_string()));
                }
                _ => {}
            },
            Statement::ExportAllDeclaration(export) if export.exported.is_none() => {
                summary.star_exports.push(export.source.value.to_string());
            }
            _ => {}
        }
    }
    summary
}

fn summarize_class<'a>(
    file: &str,
    class: &Class<'a>,
    fallback_name: Option<&str>,
    lowering: &TypeLowering<'_, 'a>,
) -> Option<ComponentDeclaration> {
    let name = match (&class.id, fallback_name) {
        (Some(id), _) => id.name.to_string(),
        (None, Some(fallback)) => fallback.to_string(),
        (None, None) => return None,
    };

    let mut members: Vec<Member> = Vec::new();
    let mut push = |member: Member| {
        if !members.iter().any(|m| m.name == member.name) {
            members.push(member);
        }
    };

    for element in &class.body.body {
        match element {
            ClassElement::PropertyDefinition(prop) => {
                if prop.r#static || is_hidden(prop.accessibility) {
                    continue;
                }
                let Some(name) = property_key_name(&prop.key) else {
                    continue;
                };
                let ty = match (&prop.type_annotation, &prop.value) {
                    (Some(annotation), _) => lowering.lower_annotation(annotation),
                    (None, Some(value)) => {
                        lowering.infer_expression(value, &|_: &str| None).widened()
                    }
                    (None, None) => Type::Any,
                };
                push(Member {
                    name,
                    kind: MemberKind::Property,
                    ty,
                    optional: prop.optional,
                });
            }
            ClassElement::AccessorProperty(prop) => {
                if prop.r#static {
                    continue;
                }
                let Some(name) = property_key_name(&prop.key) else {
                    continue;
                };
                let ty = prop
                    .type_annotation
                    .as_ref()
                    .map(|annotation| lowering.lower_annotation(annotation))
                    .unwrap_or(Type::Any);
                push(Member {
                    name,
                    kind: MemberKind::Accessor,
                    ty,
                    optional: false,
                });
            }
            ClassElement::MethodDefinition(method) => {
                if method.r#static || is_hidden(method.accessibility) {
                    continue;
                }
                let Some(name) = property_key_name(&method.key) else {
                    continue;
                };
                let func = &method.value;
                let member = match method.kind {
                    MethodDefinitionKind::Constructor => continue,
                    MethodDefinitionKind::Get => Member {
                        name,
                        kind: MemberKind::Accessor,
                        ty: func
                            .return_type
                            .as_ref()
                            .map(|annotation| lowering.lower_annotation(annotation))
                            .unwrap_or(Type::Any),
                        optional: false,
                    },
                    MethodDefinitionKind::Set => Member {
                        name,
                        kind: MemberKind::Accessor,
                        ty: lowering
                            .lower_function_params(&func.params)
                            .into_iter()
                            .next()
                            .map(|param| param.ty)
                            .unwrap_or(Type::Any),
                        optional: false,
                    },
                    MethodDefinitionKind::Method => Member {
                        name,
                        kind: MemberKind::Method,
                        ty: Type::Function(FunctionType {
                            params: lowering.lower_function_params(&func.params),
                            ret: Box::new(
                                func.return_type
                                    .as_ref()
                                    .map(|annotation| lowering.lower_annotation(annotation))
                                    .unwrap_or(Type::Any),
                            ),
                            method: true,
                        }),
                        optional: method.optional,
                    },
                };
                push(member);
            }
            _ => {}
        }
    }

    // `class Foo extends SvelteComponentTyped<{ user: User }>`
    if let (Some(Expression::Identifier(base)), Some(type_args)) =
        (&class.super_class, &class.super_type_arguments)
    {
        if SVELTE_COMPONENT_BASES.contains(&base.name.as_str()) {
            if let Some(props) = type_args.params.first() {
                if let Type::Object(obj) = lowering.lower(props) {
                    for prop in obj.properties {
                        push(Member {
                            name: prop.name,
                            kind: MemberKind::Property,
                            ty: prop.ty,
                            optional: prop.optional,
                        });
                    }
                }
            }
        }
    }

    Some(ComponentDeclaration {
        name,
        file: file.to_string(),
        start: class.span.start,
        end: class.span.end,
        members,
    })
}

fn is_hidden(accessibility: Option<TSAccessibility>) -> bool {
    matches!(
        accessibility,
        Some(TSAccessibility::Private | TSAccessibility::Protected)
    )
}
