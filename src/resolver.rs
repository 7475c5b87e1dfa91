use crate::declarations::{ImportClause, NamedDeclaration};
use crate::template::Node;

/// Pairing of component usages with the import clauses that bind their names.
#[derive(Debug, Default)]
pub struct ComponentResolution<'n, 'i> {
    /// In import order.
    pub resolved: Vec<(&'n Node, &'i ImportClause)>,
    /// In usage order.
    pub unresolved: Vec<&'n Node>,
}

/// Matches component usages against import clauses.
///
/// Clauses are visited in source order. Each clause takes the first pending
/// component with its local name, and a taken component is never matched
/// again, so a second import of the same name finds nothing to pair with.
pub fn resolve_component_imports<'n, 'i>(
    imports: &'i [ImportClause],
    components: &[&'n Node],
) -> ComponentResolution<'n, 'i> {
    let mut pending: Vec<&'n Node> = components.to_vec();
    let mut resolved = Vec::new();

    for import in imports {
        let name = import.declaration_name();
        if let Some(index) = pending.iter().position(|c| c.name() == name) {
            let component = pending.remove(index);
            resolved.push((component, import));
        }
    }

    ComponentResolution {
        resolved,
        unresolved: pending,
    }
}
