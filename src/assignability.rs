//! Structural assignability between lowered types.
//!
//! The public entry points never fail: if a relation cannot be decided (the
//! recursion limit is hit on a self-referential type) the pair is reported as
//! not assignable, which surfaces as a diagnostic instead of silently passing.

use tracing::warn;

use crate::options::CompilerOptions;
use crate::types::{FunctionType, ObjectType, Type};

const MAX_RELATION_DEPTH: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationError {
    DepthExceeded,
}

type RelationResult = Result<bool, RelationError>;

/// Returns whether `source` may be assigned to `target`.
///
/// Argument order follows the host type library this replaces: the target
/// (the declared slot) comes first, the candidate value second.
pub fn is_assignable_to_type(target: &Type, source: &Type, options: &CompilerOptions) -> bool {
    let relation = Relation::new(options);
    match relation.is_related(source, target, 0) {
        Ok(related) => related,
        Err(RelationError::DepthExceeded) => {
            warn!(
                source = %source,
                target = %target,
                "assignability check exceeded recursion limit, treating as not assignable"
            );
            false
        }
    }
}

/// One-line elaboration of why `source` is not assignable to `target`, for
/// object types whose failure can be pinned to a single property.
pub fn explain_not_assignable(
    target: &Type,
    source: &Type,
    options: &CompilerOptions,
) -> Option<String> {
    let relation = Relation::new(options);
    let (Type::Object(target_obj), Type::Object(source_obj)) = (target, source) else {
        return None;
    };

    for prop in &target_obj.properties {
        match source_obj.property(&prop.name) {
            None if !prop.optional => {
                return Some(format!(
                    "Property '{}' is missing in type '{}' but required in type '{}'.",
                    prop.name, source, target
                ));
            }
            Some(source_prop) => {
                let related =
                    relation.is_related(&source_prop.declared_type(), &prop.declared_type(), 0);
                if !matches!(related, Ok(true)) {
                    return Some(format!(
                        "Types of property '{}' are incompatible.",
                        prop.name
                    ));
                }
            }
            None => {}
        }
    }
    None
}

struct Relation {
    strict_null_checks: bool,
    strict_function_types: bool,
}

impl Relation {
    fn new(options: &CompilerOptions) -> Self {
        Self {
            strict_null_checks: options.strict_null_checks_enabled(),
            strict_function_types: options.strict_function_types_enabled(),
        }
    }

    fn is_related(&self, source: &Type, target: &Type, depth: u32) -> RelationResult {
        if depth > MAX_RELATION_DEPTH {
            return Err(RelationError::DepthExceeded);
        }
        let depth = depth + 1;

        match (source, target) {
            (_, Type::Any) | (_, Type::Unknown) => return Ok(true),
            (Type::Any, Type::Never) => return Ok(false),
            (Type::Any, _) | (Type::Never, _) => return Ok(true),
            (Type::Unknown, _) => return Ok(false),
            _ => {}
        }

        if let Type::Union(members) = source {
            for member in members {
                if !self.is_related(member, target, depth)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        if let Type::Union(members) = target {
            // `boolean` is `true | false`
            if *source == Type::Boolean
                && members.contains(&Type::BooleanLiteral(true))
                && members.contains(&Type::BooleanLiteral(false))
            {
                return Ok(true);
            }
            for member in members {
                if self.is_related(source, member, depth)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if let Type::Intersection(members) = target {
            for member in members {
                if !self.is_related(source, member, depth)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        if let Type::Intersection(members) = source {
            for member in members {
                if self.is_related(member, target, depth)? {
                    return Ok(true);
                }
            }
            if let Some(merged) = merge_object_members(members) {
                return self.is_related(&Type::Object(merged), target, depth);
            }
            return Ok(false);
        }

        match (source, target) {
            (Type::Null, Type::Null) | (Type::Undefined, Type::Undefined) => Ok(true),
            (Type::Undefined, Type::Void) => Ok(true),
            (Type::Null, _) | (Type::Undefined, _) => Ok(!self.strict_null_checks),
            (Type::Void, Type::Void) => Ok(true),
            (Type::String, Type::String)
            | (Type::Number, Type::Number)
            | (Type::Boolean, Type::Boolean)
            | (Type::BigInt, Type::BigInt)
            | (Type::Symbol, Type::Symbol)
            | (Type::NonPrimitive, Type::NonPrimitive) => Ok(true),
            (Type::StringLiteral(_), Type::String)
            | (Type::NumberLiteral(_), Type::Number)
            | (Type::BooleanLiteral(_), Type::Boolean) => Ok(true),
            (Type::StringLiteral(a), Type::StringLiteral(b)) => Ok(a == b),
            (Type::NumberLiteral(a), Type::NumberLiteral(b)) => Ok(a == b),
            (Type::BooleanLiteral(a), Type::BooleanLiteral(b)) => Ok(a == b),
            (Type::Array(s), Type::Array(t)) => self.is_related(s, t, depth),
            (Type::Tuple(elems), Type::Array(t)) => {
                for elem in elems {
                    if !self.is_related(elem, t, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Type::Tuple(s), Type::Tuple(t)) => {
                if s.len() != t.len() {
                    return Ok(false);
                }
                for (a, b) in s.iter().zip(t) {
                    if !self.is_related(a, b, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Type::Function(s), Type::Function(t)) => self.function_related(s, t, depth),
            (
                Type::Object(_)
                | Type::Array(_)
                | Type::Tuple(_)
                | Type::Function(_)
                | Type::Reference { .. },
                Type::NonPrimitive,
            ) => Ok(true),
            (
                Type::Reference { name: a, args: a_args },
                Type::Reference { name: b, args: b_args },
            ) => {
                if a != b || a_args.len() != b_args.len() {
                    return Ok(false);
                }
                for (x, y) in a_args.iter().zip(b_args) {
                    if !self.is_related(x, y, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (_, Type::Object(target_obj)) => self.object_related(source, target_obj, depth),
            _ => Ok(false),
        }
    }

    fn object_related(&self, source: &Type, target: &ObjectType, depth: u32) -> RelationResult {
        let source_obj = match source {
            Type::Object(obj) => obj,
            // Primitives, arrays, functions and opaque references only satisfy
            // object types that require nothing of them.
            _ => return Ok(target.properties.iter().all(|p| p.optional)),
        };

        for prop in &target.properties {
            match source_obj.property(&prop.name) {
                Some(source_prop) => {
                    if source_prop.optional && !prop.optional {
                        return Ok(false);
                    }
                    if !self.is_related(
                        &source_prop.declared_type(),
                        &prop.declared_type(),
                        depth,
                    )? {
                        return Ok(false);
                    }
                }
                None => {
                    if !prop.optional {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    fn function_related(
        &self,
        source: &FunctionType,
        target: &FunctionType,
        depth: u32,
    ) -> RelationResult {
        let required = source.params.iter().filter(|p| !p.optional).count();
        if required > target.params.len() {
            return Ok(false);
        }

        let bivariant = !self.strict_function_types || source.method || target.method;
        for (s, t) in source.params.iter().zip(&target.params) {
            let related = if bivariant {
                self.is_related(&t.ty, &s.ty, depth)? || self.is_related(&s.ty, &t.ty, depth)?
            } else {
                self.is_related(&t.ty, &s.ty, depth)?
            };
            if !related {
                return Ok(false);
            }
        }

        if *target.ret == Type::Void {
            return Ok(true);
        }
        self.is_related(&source.ret, &target.ret, depth)
    }
}

fn merge_object_members(members: &[Type]) -> Option<ObjectType> {
    let mut merged = ObjectType::default();
    for member in members {
        let Type::Object(obj) = member else {
            return None;
        };
        for prop in &obj.properties {
            if merged.property(&prop.name).is_none() {
                merged.properties.push(prop.clone());
            }
        }
    }
    Some(merged)
}
