use std::collections::HashMap;
use std::rc::Rc;

use crate::cache::CompilationCache;
use crate::declarations::ScriptScope;
use crate::diagnostics::{create_import_not_found, Diagnostic};
use crate::error::CheckerError;
use crate::options::CompilerOptions;
use crate::program::{ComponentDeclaration, TypeHost};
use crate::properties::{NodeContext, PropertyChecker};
use crate::resolver::resolve_component_imports;
use crate::source::{reconstruct_source, template_file_for_script, SourceFile, SourceHost};
use crate::template::Node;

const SVELTE_ELEMENT_PREFIX: &str = "svelte:";

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Cross-checks component usages in a Svelte template against the declared
/// types of the components they instantiate.
///
/// The checker holds configuration and borrowed collaborators only, so one
/// instance may check any number of files, from any number of threads when
/// the collaborators allow it.
pub struct SvelteTypeChecker<'a, S: SourceHost, T: TypeHost> {
    options: CompilerOptions,
    cache: &'a CompilationCache,
    sources: &'a S,
    types: &'a T,
}

impl<'a, S: SourceHost, T: TypeHost> SvelteTypeChecker<'a, S, T> {
    pub fn new(
        options: CompilerOptions,
        cache: &'a CompilationCache,
        sources: &'a S,
        types: &'a T,
    ) -> Self {
        Self {
            options,
            cache,
            sources,
            types,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// All diagnostics for one compiled script file, in document order.
    ///
    /// Fails if the file was never compiled into the cache or its template
    /// cannot be read; neither is a problem of the checked source.
    pub fn gather_all_diagnostics(
        &self,
        script_file: &str,
    ) -> Result<Vec<Diagnostic>, CheckerError> {
        let entry = self
            .cache
            .get(script_file)
            .ok_or_else(|| CheckerError::NotInCompilationCache(script_file.to_string()))?;

        let template_file = template_file_for_script(script_file);
        let template = self.sources.read_file(&template_file).ok_or_else(|| {
            CheckerError::MissingTemplateSource {
                script: script_file.to_string(),
                file: template_file.clone(),
            }
        })?;
        let source = SourceFile::new(
            template_file,
            reconstruct_source(&template, &entry.compiled_source),
        );
        let scope = ScriptScope::parse(script_file, &entry.compiled_source);

        tracing::debug!(file = script_file, "gathering template diagnostics");

        let mut run = CheckRun {
            options: &self.options,
            types: self.types,
            script_file,
            declaration_names: scope.declaration_names(),
            scope: &scope,
            source: &source,
            member_names: HashMap::new(),
        };
        let mut diagnostics = Vec::new();
        // The root is always the top-level fragment.
        run.gather_node_diagnostics(&entry.compilation.ast.html, None, &mut diagnostics);

        tracing::debug!(
            file = script_file,
            diagnostics = diagnostics.len(),
            "finished template diagnostics"
        );
        Ok(diagnostics)
    }
}

/// State owned by one `gather_all_diagnostics` call.
struct CheckRun<'r, T: TypeHost> {
    options: &'r CompilerOptions,
    types: &'r T,
    script_file: &'r str,
    scope: &'r ScriptScope,
    declaration_names: Vec<&'r str>,
    source: &'r SourceFile,
    /// Member names per component declaration, keyed by (file, class).
    member_names: HashMap<(String, String), Rc<[String]>>,
}

impl<'r, T: TypeHost> CheckRun<'r, T> {
    fn gather_node_diagnostics(
        &mut self,
        node: &Node,
        parent: Option<&Node>,
        out: &mut Vec<Diagnostic>,
    ) {
        tracing::trace!(
            kind = ?node.kind,
            start = node.start,
            parent = ?parent.map(|p| p.kind),
            "visit template node"
        );

        if node.is_inline_component() {
            self.gather_component_diagnostics(node, out);
        }

        for child in &node.children {
            self.gather_node_diagnostics(child, Some(node), out);
        }
        if let Some(else_branch) = node.else_branch.as_deref() {
            self.gather_node_diagnostics(else_branch, Some(node), out);
        }
    }

    fn gather_component_diagnostics(&mut self, component: &Node, out: &mut Vec<Diagnostic>) {
        // <svelte:self>, <svelte:component> and friends have no import
        if component.name().starts_with(SVELTE_ELEMENT_PREFIX) {
            tracing::debug!(component = component.name(), "skipping svelte special element");
            return;
        }

        let scope = self.scope;
        let resolution = resolve_component_imports(scope.imports(), &[component]);

        for unresolved in &resolution.unresolved {
            out.push(create_import_not_found(unresolved, self.source));
        }

        for (usage, import) in resolution.resolved {
            match self.types.resolve_import(import, self.script_file) {
                Some(declaration) => {
                    self.gather_component_property_diagnostics(&declaration, usage, out);
                }
                None => {
                    tracing::debug!(
                        component = usage.name(),
                        module = %import.module_specifier,
                        "import has no component class declaration, skipping"
                    );
                }
            }
        }
    }

    fn gather_component_property_diagnostics(
        &mut self,
        declaration: &ComponentDeclaration,
        component: &Node,
        out: &mut Vec<Diagnostic>,
    ) {
        let member_names = self
            .member_names
            .entry((declaration.file.clone(), declaration.name.clone()))
            .or_insert_with(|| declaration.member_names().into())
            .clone();

        let checker = PropertyChecker {
            options: self.options,
            scope: self.scope,
            declaration_names: &self.declaration_names,
            source: self.source,
            component: declaration,
            member_names: &member_names,
        };
        for attribute in &component.attributes {
            checker.gather(attribute, NodeContext::component(component), out);
        }
    }
}
