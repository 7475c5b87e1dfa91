//! Per-attribute checks of one component usage against its class declaration.

use crate::assignability::{explain_not_assignable, is_assignable_to_type};
use crate::declarations::ScriptScope;
use crate::diagnostics::{
    create_component_types_not_assignable, create_declaration_not_found,
    create_non_existent_property, create_spread_not_assignable, Diagnostic, TypeMismatch,
};
use crate::options::CompilerOptions;
use crate::program::ComponentDeclaration;
use crate::source::SourceFile;
use crate::template::Node;

/// Where a node sits while its diagnostics are gathered. Passed down the
/// recursion instead of being stored on the node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'n> {
    pub parent: &'n Node,
    /// The attribute whose value contains the node, if any.
    pub attribute: Option<&'n Node>,
}

impl<'n> NodeContext<'n> {
    pub fn component(component: &'n Node) -> Self {
        Self {
            parent: component,
            attribute: None,
        }
    }

    fn child(self, parent: &'n Node) -> Self {
        Self {
            parent,
            attribute: self.attribute,
        }
    }
}

pub struct PropertyChecker<'a> {
    pub options: &'a CompilerOptions,
    pub scope: &'a ScriptScope,
    pub declaration_names: &'a [&'a str],
    pub source: &'a SourceFile,
    pub component: &'a ComponentDeclaration,
    pub member_names: &'a [String],
}

impl<'a> PropertyChecker<'a> {
    pub fn gather<'n>(&self, node: &'n Node, ctx: NodeContext<'n>, out: &mut Vec<Diagnostic>) {
        if node.is_identifier() {
            self.check_identifier(node, ctx, out);
        } else if node.is_attribute() {
            if !self.member_names.iter().any(|m| m == node.name()) {
                out.push(create_non_existent_property(
                    self.member_names,
                    node,
                    &self.component.name,
                    self.source,
                ));
                return;
            }
            let value_ctx = NodeContext {
                parent: node,
                attribute: Some(node),
            };
            for value in node.value.nodes() {
                self.gather(value, value_ctx, out);
            }
        } else if node.is_expression_wrapper() {
            if let Some(expression) = node.expression.as_deref() {
                self.gather(expression, ctx.child(node), out);
            }
        }
    }

    fn check_identifier(&self, node: &Node, ctx: NodeContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(declaration) = self.scope.declaration_by_name(node.name()) else {
            out.push(create_declaration_not_found(
                self.declaration_names,
                node,
                self.source,
            ));
            return;
        };

        if ctx.parent.is_spread() {
            let component_type = self.component.instance_type();
            if !is_assignable_to_type(&component_type, &declaration.ty, self.options) {
                out.push(create_spread_not_assignable(
                    node,
                    &declaration.ty.to_string(),
                    &self.component.name,
                    self.source,
                ));
            }
            return;
        }

        let property = ctx.attribute.unwrap_or(node);
        let Some(member) = self.component.member(property.name()) else {
            out.push(create_non_existent_property(
                self.member_names,
                property,
                &self.component.name,
                self.source,
            ));
            return;
        };

        let member_type = member.declared_type();
        if !is_assignable_to_type(&member_type, &declaration.ty, self.options) {
            let source_type = declaration.ty.to_string();
            let target_type = member.ty.to_string();
            out.push(create_component_types_not_assignable(
                node,
                TypeMismatch {
                    source_type: &source_type,
                    target_type: &target_type,
                    property: &member.name,
                    component_name: &self.component.name,
                    elaboration: explain_not_assignable(
                        &member.ty,
                        &declaration.ty,
                        self.options,
                    ),
                },
                self.source,
            ));
        }
    }
}
