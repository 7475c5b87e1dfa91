use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceFile;
use crate::template::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

/// Stable codes, one per diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DiagnosticCode {
    DeclarationNotFound = 2304,
    ComponentImportNotFound = 2307,
    ComponentTypesNotAssignable = 2322,
    NonExistentProperty = 2339,
}

impl DiagnosticCode {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            2304 => Some(Self::DeclarationNotFound),
            2307 => Some(Self::ComponentImportNotFound),
            2322 => Some(Self::ComponentTypesNotAssignable),
            2339 => Some(Self::NonExistentProperty),
            _ => None,
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::DeclarationNotFound => "Cannot find name '{0}'.",
            Self::ComponentImportNotFound => "Import declaration for '{0}' cannot be found.",
            Self::ComponentTypesNotAssignable => "Type '{0}' is not assignable to type '{1}'.",
            Self::NonExistentProperty => "Property '{0}' does not exist on component '{1}'.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file: String,
    pub category: DiagnosticCategory,
    pub start: u32,
    pub length: u32,
    pub code: u32,
    pub message_text: String,
    /// 1-based, in the reconstructed source.
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    fn error(source: &SourceFile, node: &Node, code: DiagnosticCode, message_text: String) -> Self {
        let (line, column) = source.line_and_column(node.start);
        Self {
            file: source.file_name.clone(),
            category: DiagnosticCategory::Error,
            start: node.start,
            length: node.len(),
            code: code.code(),
            message_text,
            line,
            column,
        }
    }

    pub fn kind(&self) -> Option<DiagnosticCode> {
        DiagnosticCode::from_code(self.code)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = match self.category {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
        };
        write!(
            f,
            "{}({},{}): {} TS{}: {}",
            self.file, self.line, self.column, category, self.code, self.message_text
        )
    }
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Joins a headline with its elaboration lines, each further line indented
/// one level.
pub fn format_diagnostic_message_texts<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(AsRef::as_ref)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n  ")
}

pub fn create_declaration_not_found(
    declaration_names: &[&str],
    node: &Node,
    source: &SourceFile,
) -> Diagnostic {
    let name = node.name();
    let mut texts = vec![format_message(
        DiagnosticCode::DeclarationNotFound.template(),
        &[name],
    )];
    if let Some(suggestion) = spelling_suggestion(name, declaration_names.iter().copied()) {
        texts.push(format!("Did you mean '{}'?", suggestion));
    }
    Diagnostic::error(
        source,
        node,
        DiagnosticCode::DeclarationNotFound,
        format_diagnostic_message_texts(&texts),
    )
}

pub fn create_import_not_found(component: &Node, source: &SourceFile) -> Diagnostic {
    Diagnostic::error(
        source,
        component,
        DiagnosticCode::ComponentImportNotFound,
        format_message(
            DiagnosticCode::ComponentImportNotFound.template(),
            &[component.name()],
        ),
    )
}

/// `property` is the attribute (or shorthand identifier) naming the missing
/// member.
pub fn create_non_existent_property(
    member_names: &[String],
    property: &Node,
    component_name: &str,
    source: &SourceFile,
) -> Diagnostic {
    let name = property.name();
    let mut texts = vec![format_message(
        DiagnosticCode::NonExistentProperty.template(),
        &[name, component_name],
    )];
    if let Some(suggestion) = spelling_suggestion(name, member_names.iter().map(String::as_str)) {
        texts.push(format!("Did you mean '{}'?", suggestion));
    }
    Diagnostic::error(
        source,
        property,
        DiagnosticCode::NonExistentProperty,
        format_diagnostic_message_texts(&texts),
    )
}

pub struct TypeMismatch<'a> {
    pub source_type: &'a str,
    pub target_type: &'a str,
    pub property: &'a str,
    pub component_name: &'a str,
    pub elaboration: Option<String>,
}

pub fn create_component_types_not_assignable(
    node: &Node,
    mismatch: TypeMismatch<'_>,
    source: &SourceFile,
) -> Diagnostic {
    let mut texts = vec![format_message(
        DiagnosticCode::ComponentTypesNotAssignable.template(),
        &[mismatch.source_type, mismatch.target_type],
    )];
    if let Some(elaboration) = mismatch.elaboration {
        texts.push(elaboration);
    }
    texts.push(format!(
        "The expected type comes from property '{}' which is declared on component '{}'.",
        mismatch.property, mismatch.component_name
    ));
    Diagnostic::error(
        source,
        node,
        DiagnosticCode::ComponentTypesNotAssignable,
        format_diagnostic_message_texts(&texts),
    )
}

pub fn create_spread_not_assignable(
    node: &Node,
    spread_type: &str,
    component_name: &str,
    source: &SourceFile,
) -> Diagnostic {
    Diagnostic::error(
        source,
        node,
        DiagnosticCode::ComponentTypesNotAssignable,
        format!(
            "Type '{}' is not assignable to the props of component '{}'.",
            spread_type, component_name
        ),
    )
}

/// Closest candidate within a third of the name's length, preferring a
/// case-insensitive exact match.
fn spelling_suggestion<'c>(
    name: &str,
    candidates: impl Iterator<Item = &'c str>,
) -> Option<&'c str> {
    let max_distance = (name.chars().count() as f64 * 0.34).floor().max(2.0) as usize;
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        if candidate == name {
            continue;
        }
        if candidate.eq_ignore_ascii_case(name) {
            return Some(candidate);
        }
        let length_gap = candidate.chars().count().abs_diff(name.chars().count());
        if length_gap > max_distance {
            continue;
        }
        let distance = levenshtein_distance(name, candidate);
        if distance > max_distance {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];
    for i in 1..=a_chars.len() {
        curr[0] = i;
        for j in 1..=b_chars.len() {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::NodeKind;

    fn named(kind: NodeKind, name: &str, start: u32, end: u32) -> Node {
        let mut node = Node::new(kind, start, end);
        node.name = Some(name.to_string());
        node
    }

    #[test]
    fn test_declaration_not_found_with_suggestion() {
        let source = SourceFile::new("App.svelte", "<script></script>\n<Foo value={usr} />");
        let node = named(NodeKind::Identifier, "usr", 30, 33);
        let diagnostic = create_declaration_not_found(&["user", "count"], &node, &source);

        assert_eq!(diagnostic.code, 2304);
        assert_eq!(diagnostic.kind(), Some(DiagnosticCode::DeclarationNotFound));
        assert_eq!(diagnostic.start, 30);
        assert_eq!(diagnostic.length, 3);
        assert_eq!((diagnostic.line, diagnostic.column), (2, 13));
        assert_eq!(
            diagnostic.message_text,
            "Cannot find name 'usr'.\n  Did you mean 'user'?"
        );
    }

    #[test]
    fn test_non_existent_property_without_close_match() {
        let source = SourceFile::new("App.svelte", "<Widget foo=\"bar\" />");
        let node = named(NodeKind::Attribute, "foo", 8, 17);
        let members = vec!["title".to_string(), "size".to_string()];
        let diagnostic = create_non_existent_property(&members, &node, "Widget", &source);

        assert_eq!(diagnostic.code, 2339);
        assert_eq!(
            diagnostic.message_text,
            "Property 'foo' does not exist on component 'Widget'."
        );
    }

    #[test]
    fn test_import_not_found_message() {
        let source = SourceFile::new("App.svelte", "<Foo />");
        let node = named(NodeKind::InlineComponent, "Foo", 0, 7);
        let diagnostic = create_import_not_found(&node, &source);
        assert_eq!(diagnostic.code, 2307);
        assert_eq!(
            diagnostic.message_text,
            "Import declaration for 'Foo' cannot be found."
        );
        assert_eq!(
            diagnostic.to_string(),
            "App.svelte(1,1): error TS2307: Import declaration for 'Foo' cannot be found."
        );
    }

    #[test]
    fn test_types_not_assignable_lines() {
        let source = SourceFile::new("App.svelte", "<Profile user={user} />");
        let node = named(NodeKind::Identifier, "user", 15, 19);
        let diagnostic = create_component_types_not_assignable(
            &node,
            TypeMismatch {
                source_type: "{ name: string; }",
                target_type: "{ name: string; age: number; }",
                property: "user",
                component_name: "Profile",
                elaboration: Some("Property 'age' is missing.".to_string()),
            },
            &source,
        );
        let lines: Vec<&str> = diagnostic.message_text.split("\n  ").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Type '{ name: string; }' is not assignable to type '{ name: string; age: number; }'."
        );
        assert!(lines[2].contains("component 'Profile'"));
    }

    #[test]
    fn test_spelling_suggestion() {
        let candidates = ["title", "subtitle", "Size"];
        assert_eq!(spelling_suggestion("titel", candidates.iter().copied()), Some("title"));
        assert_eq!(spelling_suggestion("size", candidates.iter().copied()), Some("Size"));
        assert_eq!(spelling_suggestion("onclick", candidates.iter().copied()), None);
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }
}
