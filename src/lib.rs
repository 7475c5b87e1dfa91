//! # Svelte Template Type Checker
//!
//! Cross-checks the component usages in a compiled Svelte template against the
//! TypeScript declarations of the components they instantiate.
//!
//! ## Pipeline
//!
//! 1. **Lookup**: the compiled script text and template AST come from the
//!    [`CompilationCache`], keyed by script file name. A missing entry is an
//!    error, not a diagnostic.
//! 2. **Reconstruction**: the template source is read through a
//!    [`SourceHost`] and its `<script>` region is replaced with the compiled
//!    script, giving the text diagnostic positions refer to.
//! 3. **Indexing**: the compiled script is parsed into a [`ScriptScope`]:
//!    declarations with their types, and import clauses.
//! 4. **Walking**: the template tree is traversed in document order. Each
//!    inline component is paired with its import, resolved to a class
//!    declaration through a [`TypeHost`], and its attributes are checked.
//!
//! ## Diagnostics
//!
//! | Code | Kind | Raised when |
//! |------|------|-------------|
//! | 2304 | `DeclarationNotFound` | an attribute expression names an undeclared identifier |
//! | 2307 | `ComponentImportNotFound` | a component is used without an import of its name |
//! | 2322 | `ComponentTypesNotAssignable` | a bound value or spread object does not fit the props |
//! | 2339 | `NonExistentProperty` | an attribute names no member of the component |
//!
//! Identifier lookup is flat: the first script declaration with the name wins,
//! whatever block it was declared in. Only variables and functions are
//! indexed; an imported binding or a script-level class used as an attribute
//! value is reported as `DeclarationNotFound`.
//!
//! `svelte:`-prefixed elements (`<svelte:self>`, `<svelte:component>`) are not
//! imported and are skipped.

mod assignability;
mod cache;
mod checker;
mod declarations;
mod diagnostics;
mod error;
mod lower;
mod options;
mod program;
mod properties;
mod resolver;
mod source;
mod template;
mod types;

#[cfg(test)]
mod checker_tests;

pub use assignability::{explain_not_assignable, is_assignable_to_type};
pub use cache::{Ast, CompilationCache, CompilationEntry, CompilationResult};
pub use checker::SvelteTypeChecker;
pub use declarations::{
    Declaration, DeclarationKind, ImportClause, ImportedBinding, NamedDeclaration, ScriptScope,
};
pub use diagnostics::{
    format_diagnostic_message_texts, Diagnostic, DiagnosticCategory, DiagnosticCode,
};
pub use error::CheckerError;
pub use options::CompilerOptions;
pub use program::{ComponentDeclaration, Member, MemberKind, Program, TypeHost};
pub use resolver::{resolve_component_imports, ComponentResolution};
pub use source::{
    reconstruct_source, template_file_for_script, FsSourceHost, SourceFile, SourceHost,
};
pub use template::{AttributeValue, Node, NodeKind};
pub use types::{FunctionType, ObjectType, Parameter, Property, Type};
