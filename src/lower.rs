//! Lowering of TypeScript type syntax (and initialiser expressions) into the
//! owned structural [`Type`] model.

use std::collections::HashMap;

use oxc_ast::ast::{
    ArrayExpressionElement, Expression, FormalParameters, ObjectPropertyKind, PropertyKey,
    Statement, TSLiteral, TSSignature, TSTupleElement, TSType, TSTypeAnnotation,
    TSTypeName, TSTypeOperatorOperator, UnaryOperator,
};

use crate::types::{FunctionType, ObjectType, Parameter, Property, Type};

/// A named type declared at module level.
enum NamedType<'s, 'a> {
    Alias(&'s TSType<'a>),
    Interface(&'s oxc_allocator::Vec<'a, TSSignature<'a>>),
}

/// Resolves type syntax against the `type` and `interface` declarations of one
/// module. Recursive references stay as nominal [`Type::Reference`]s.
pub struct TypeLowering<'s, 'a> {
    named: HashMap<String, NamedType<'s, 'a>>,
}

impl<'s, 'a> TypeLowering<'s, 'a> {
    pub fn new(body: &'s [Statement<'a>]) -> Self {
        let mut named = HashMap::new();
        for stmt in body {
            match stmt {
                Statement::TSTypeAliasDeclaration(alias) => {
                    named
                        .entry(alias.id.name.to_string())
                        .or_insert(NamedType::Alias(&alias.type_annotation));
                }
                Statement::TSInterfaceDeclaration(iface) => {
                    named
                        .entry(iface.id.name.to_string())
                        .or_insert(NamedType::Interface(&iface.body.body));
                }
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(oxc_ast::ast::Declaration::TSTypeAliasDeclaration(alias)) => {
                        named
                            .entry(alias.id.name.to_string())
                            .or_insert(NamedType::Alias(&alias.type_annotation));
                    }
                    Some(oxc_ast::ast::Declaration::TSInterfaceDeclaration(iface)) => {
                        named
                            .entry(iface.id.name.to_string())
                            .or_insert(NamedType::Interface(&iface.body.body));
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        Self { named }
    }

    pub fn lower_annotation(&self, annotation: &TSTypeAnnotation<'a>) -> Type {
        self.lower(&annotation.type_annotation)
    }

    pub fn lower(&self, ty: &TSType<'a>) -> Type {
        let mut resolving = Vec::new();
        self.lower_type(ty, &mut resolving)
    }

    fn lower_type(&self, ty: &TSType<'a>, resolving: &mut Vec<String>) -> Type {
        match ty {
            TSType::TSAnyKeyword(_) => Type::Any,
            TSType::TSUnknownKeyword(_) => Type::Unknown,
            TSType::TSNeverKeyword(_) => Type::Never,
            TSType::TSVoidKeyword(_) => Type::Void,
            TSType::TSUndefinedKeyword(_) => Type::Undefined,
            TSType::TSNullKeyword(_) => Type::Null,
            TSType::TSStringKeyword(_) => Type::String,
            TSType::TSNumberKeyword(_) => Type::Number,
            TSType::TSBooleanKeyword(_) => Type::Boolean,
            TSType::TSBigIntKeyword(_) => Type::BigInt,
            TSType::TSSymbolKeyword(_) => Type::Symbol,
            TSType::TSObjectKeyword(_) => Type::NonPrimitive,
            TSType::TSLiteralType(lit) => match &lit.literal {
                TSLiteral::StringLiteral(s) => Type::StringLiteral(s.value.to_string()),
                TSLiteral::NumericLiteral(n) => Type::NumberLiteral(n.value),
                TSLiteral::BooleanLiteral(b) => Type::BooleanLiteral(b.value),
                TSLiteral::BigIntLiteral(_) => Type::BigInt,
                TSLiteral::TemplateLiteral(_) => Type::String,
                TSLiteral::UnaryExpression(_) => Type::Number,
            },
            TSType::TSTemplateLiteralType(_) => Type::String,
            TSType::TSArrayType(arr) => {
                Type::Array(Box::new(self.lower_type(&arr.element_type, resolving)))
            }
            TSType::TSTupleType(tuple) => Type::Tuple(
                tuple
                    .element_types
                    .iter()
                    .map(|elem| self.lower_tuple_element(elem, resolving))
                    .collect(),
            ),
            TSType::TSUnionType(union) => Type::union(
                union
                    .types
                    .iter()
                    .map(|t| self.lower_type(t, resolving))
                    .collect(),
            ),
            TSType::TSIntersectionType(inter) => Type::Intersection(
                inter
                    .types
                    .iter()
                    .map(|t| self.lower_type(t, resolving))
                    .collect(),
            ),
            TSType::TSParenthesizedType(paren) => {
                self.lower_type(&paren.type_annotation, resolving)
            }
            TSType::TSTypeOperatorType(op) => match op.operator {
                TSTypeOperatorOperator::Readonly => self.lower_type(&op.type_annotation, resolving),
                _ => Type::Any,
            },
            TSType::TSTypeLiteral(lit) => {
                Type::Object(self.lower_signatures(&lit.members, resolving))
            }
            TSType::TSFunctionType(func) => Type::Function(FunctionType {
                params: self.lower_params(&func.params, resolving),
                ret: Box::new(self.lower_type(&func.return_type.type_annotation, resolving)),
                method: false,
            }),
            TSType::TSTypeReference(reference) => {
                let name = type_name(&reference.type_name);
                let args: Vec<Type> = reference
                    .type_arguments
                    .as_ref()
                    .map(|params| {
                        params
                            .params
                            .iter()
                            .map(|t| self.lower_type(t, resolving))
                            .collect()
                    })
                    .unwrap_or_default();
                self.lower_reference(name, args, resolving)
            }
            _ => Type::Any,
        }
    }

    fn lower_tuple_element(&self, elem: &TSTupleElement<'a>, resolving: &mut Vec<String>) -> Type {
        match elem {
            TSTupleElement::TSOptionalType(opt) => Type::union(vec![
                self.lower_type(&opt.type_annotation, resolving),
                Type::Undefined,
            ]),
            TSTupleElement::TSRestType(rest) => self.lower_type(&rest.type_annotation, resolving),
            other => match other.as_ts_type() {
                Some(ty) => self.lower_type(ty, resolving),
                None => Type::Any,
            },
        }
    }

    fn lower_reference(&self, name: String, args: Vec<Type>, resolving: &mut Vec<String>) -> Type {
        match (name.as_str(), args.len()) {
            ("Array" | "ReadonlyArray", 1) => {
                return Type::Array(Box::new(args.into_iter().next().unwrap_or(Type::Any)));
            }
            ("Function", 0) => return Type::NonPrimitive,
            ("Object", 0) => return Type::Object(ObjectType::default()),
            _ => {}
        }

        let Some(named) = self.named.get(&name) else {
            return Type::Reference { name, args };
        };
        if resolving.contains(&name) {
            return Type::Reference { name, args };
        }

        resolving.push(name.clone());
        let lowered = match named {
            NamedType::Alias(ty) => self.lower_type(ty, resolving),
            NamedType::Interface(members) => {
                let mut obj = self.lower_signatures(members, resolving);
                obj.name = Some(name);
                Type::Object(obj)
            }
        };
        resolving.pop();
        lowered
    }

    fn lower_signatures(
        &self,
        members: &oxc_allocator::Vec<'a, TSSignature<'a>>,
        resolving: &mut Vec<String>,
    ) -> ObjectType {
        let mut properties = Vec::new();
        for member in members {
            match member {
                TSSignature::TSPropertySignature(sig) => {
                    let Some(name) = property_key_name(&sig.key) else {
                        continue;
                    };
                    let ty = sig
                        .type_annotation
                        .as_ref()
                        .map(|ann| self.lower_type(&ann.type_annotation, resolving))
                        .unwrap_or(Type::Any);
                    properties.push(Property {
                        name,
                        ty,
                        optional: sig.optional,
                    });
                }
                TSSignature::TSMethodSignature(sig) => {
                    let Some(name) = property_key_name(&sig.key) else {
                        continue;
                    };
                    let ret = sig
                        .return_type
                        .as_ref()
                        .map(|ann| self.lower_type(&ann.type_annotation, resolving))
                        .unwrap_or(Type::Any);
                    properties.push(Property {
                        name,
                        ty: Type::Function(FunctionType {
                            params: self.lower_params(&sig.params, resolving),
                            ret: Box::new(ret),
                            method: true,
                        }),
                        optional: sig.optional,
                    });
                }
                _ => {}
            }
        }
        ObjectType::anonymous(properties)
    }

    pub fn lower_function_params(&self, params: &FormalParameters<'a>) -> Vec<Parameter> {
        let mut resolving = Vec::new();
        self.lower_params(params, &mut resolving)
    }

    fn lower_params(
        &self,
        params: &FormalParameters<'a>,
        resolving: &mut Vec<String>,
    ) -> Vec<Parameter> {
        params
            .items
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = match &param.pattern {
                    oxc_ast::ast::BindingPattern::BindingIdentifier(id) => id.name.to_string(),
                    _ => format!("arg{}", i),
                };
                let ty = param
                    .type_annotation
                    .as_ref()
                    .map(|ann| self.lower_type(&ann.type_annotation, resolving))
                    .unwrap_or(Type::Any);
                Parameter {
                    name,
                    ty,
                    optional: param.optional,
                }
            })
            .collect()
    }

    /// Infers the type of an initialiser. `lookup` resolves identifiers that
    /// refer to earlier declarations. Literal types are kept; callers widen
    /// them for mutable bindings.
    pub fn infer_expression(
        &self,
        expr: &Expression<'a>,
        lookup: &dyn Fn(&str) -> Option<Type>,
    ) -> Type {
        match expr {
            Expression::StringLiteral(s) => Type::StringLiteral(s.value.to_string()),
            Expression::NumericLiteral(n) => Type::NumberLiteral(n.value),
            Expression::BooleanLiteral(b) => Type::BooleanLiteral(b.value),
            Expression::BigIntLiteral(_) => Type::BigInt,
            Expression::NullLiteral(_) => Type::Null,
            Expression::TemplateLiteral(_) => Type::String,
            Expression::Identifier(id) if id.name == "undefined" => Type::Undefined,
            Expression::Identifier(id) => lookup(id.name.as_str()).unwrap_or(Type::Any),
            Expression::ParenthesizedExpression(paren) => {
                self.infer_expression(&paren.expression, lookup)
            }
            Expression::TSAsExpression(cast) => self.lower(&cast.type_annotation),
            Expression::TSSatisfiesExpression(sat) => self.lower(&sat.type_annotation),
            Expression::UnaryExpression(unary) => match unary.operator {
                UnaryOperator::LogicalNot => Type::Boolean,
                UnaryOperator::Typeof => Type::String,
                UnaryOperator::Void => Type::Undefined,
                UnaryOperator::UnaryNegation | UnaryOperator::UnaryPlus => Type::Number,
                _ => Type::Any,
            },
            Expression::ObjectExpression(obj) => {
                let mut properties = Vec::new();
                for kind in &obj.properties {
                    if let ObjectPropertyKind::ObjectProperty(prop) = kind {
                        let Some(name) = property_key_name(&prop.key) else {
                            continue;
                        };
                        let ty = self.infer_expression(&prop.value, lookup).widened();
                        properties.push(Property {
                            name,
                            ty,
                            optional: false,
                        });
                    }
                }
                Type::Object(ObjectType::anonymous(properties))
            }
            Expression::ArrayExpression(arr) => {
                let elements: Vec<Type> = arr
                    .elements
                    .iter()
                    .filter_map(ArrayExpressionElement::as_expression)
                    .map(|e| self.infer_expression(e, lookup).widened())
                    .collect();
                if elements.is_empty() {
                    Type::Array(Box::new(Type::Any))
                } else {
                    Type::Array(Box::new(Type::union(elements)))
                }
            }
            Expression::ArrowFunctionExpression(arrow) => Type::Function(FunctionType {
                params: self.lower_function_params(&arrow.params),
                ret: Box::new(
                    arrow
                        .return_type
                        .as_ref()
                        .map(|ann| self.lower_annotation(ann))
                        .unwrap_or(Type::Any),
                ),
                method: false,
            }),
            Expression::FunctionExpression(func) => Type::Function(FunctionType {
                params: self.lower_function_params(&func.params),
                ret: Box::new(
                    func.return_type
                        .as_ref()
                        .map(|ann| self.lower_annotation(ann))
                        .unwrap_or(Type::Any),
                ),
                method: false,
            }),
            Expression::NewExpression(new_expr) => match &new_expr.callee {
                Expression::Identifier(id) => Type::Reference {
                    name: id.name.to_string(),
                    args: vec![],
                },
                _ => Type::Any,
            },
            _ => Type::Any,
        }
    }
}

fn type_name(name: &TSTypeName) -> String {
    match name {
        TSTypeName::IdentifierReference(id) => id.name.to_string(),
        TSTypeName::QualifiedName(q) => format!("{}.{}", type_name(&q.left), q.right.name),
        _ => "this".to_string(),
    }
}

/// Static name of a property key; computed and private keys have none.
pub fn property_key_name(key: &PropertyKey) -> Option<String> {
    match key {
        PropertyKey::PrivateIdentifier(_) => None,
        _ => key.static_name().map(|name| name.to_string()),
    }
}
