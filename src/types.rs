//! Structural type model used by the assignability checker.
//!
//! Types are plain owned values lowered from TypeScript syntax (see
//! `lower.rs`), so they outlive the parser arena they were read from.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    /// The `object` keyword: any non-primitive.
    NonPrimitive,
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Function(FunctionType),
    Object(ObjectType),
    /// A named type the lowering could not expand (globals, imported types,
    /// recursive aliases). Compared nominally.
    Reference { name: String, args: Vec<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Parameter>,
    pub ret: Box<Type>,
    /// Methods keep bivariant parameters even under `strictFunctionTypes`.
    pub method: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    /// Class name for instance types; anonymous for literals.
    pub name: Option<String>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

impl Property {
    /// The type a value must have to fill this slot. Optional properties
    /// also accept `undefined`.
    pub fn declared_type(&self) -> Type {
        optional_type(&self.ty, self.optional)
    }
}

pub(crate) fn optional_type(ty: &Type, optional: bool) -> Type {
    if optional {
        Type::union(vec![ty.clone(), Type::Undefined])
    } else {
        ty.clone()
    }
}

impl ObjectType {
    pub fn anonymous(properties: Vec<Property>) -> Self {
        Self {
            name: None,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl Type {
    /// Builds a union, flattening nested unions and dropping duplicates.
    /// A single remaining member is returned unwrapped.
    pub fn union(members: Vec<Type>) -> Type {
        let mut flat: Vec<Type> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Type::Union(inner) => {
                    for t in inner {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
                t => {
                    if !flat.contains(&t) {
                        flat.push(t);
                    }
                }
            }
        }
        match flat.len() {
            0 => Type::Never,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// Literal types widen to their primitive, recursively through unions.
    pub fn widened(self) -> Type {
        match self {
            Type::StringLiteral(_) => Type::String,
            Type::NumberLiteral(_) => Type::Number,
            Type::BooleanLiteral(_) => Type::Boolean,
            Type::Union(members) => Type::union(members.into_iter().map(Type::widened).collect()),
            t => t,
        }
    }

    /// Property lookup used for destructuring and member resolution.
    pub fn property_type(&self, name: &str) -> Option<Type> {
        match self {
            Type::Any => Some(Type::Any),
            Type::Object(obj) => obj.property(name).map(|p| p.ty.clone()),
            Type::Intersection(members) => members.iter().find_map(|m| m.property_type(name)),
            _ => None,
        }
    }

    pub fn element_type(&self, index: usize) -> Option<Type> {
        match self {
            Type::Any => Some(Type::Any),
            Type::Array(elem) => Some((**elem).clone()),
            Type::Tuple(elems) => elems.get(index).cloned(),
            _ => None,
        }
    }
}

fn needs_parens_in_array(ty: &Type) -> bool {
    matches!(ty, Type::Union(_) | Type::Intersection(_) | Type::Function(_))
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Unknown => f.write_str("unknown"),
            Type::Never => f.write_str("never"),
            Type::Void => f.write_str("void"),
            Type::Undefined => f.write_str("undefined"),
            Type::Null => f.write_str("null"),
            Type::String => f.write_str("string"),
            Type::Number => f.write_str("number"),
            Type::Boolean => f.write_str("boolean"),
            Type::BigInt => f.write_str("bigint"),
            Type::Symbol => f.write_str("symbol"),
            Type::NonPrimitive => f.write_str("object"),
            Type::StringLiteral(s) => write!(f, "\"{}\"", s),
            Type::NumberLiteral(n) => write!(f, "{}", n),
            Type::BooleanLiteral(b) => write!(f, "{}", b),
            Type::Array(elem) => {
                if needs_parens_in_array(elem) {
                    write!(f, "({})[]", elem)
                } else {
                    write!(f, "{}[]", elem)
                }
            }
            Type::Tuple(elems) => {
                f.write_str("[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                f.write_str("]")
            }
            Type::Union(members) => write_joined(f, members, " | "),
            Type::Intersection(members) => write_joined(f, members, " & "),
            Type::Function(func) => write!(f, "{}", func),
            Type::Object(obj) => write!(f, "{}", obj),
            Type::Reference { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if matches!(ty, Type::Function(_)) {
            write!(f, "({})", ty)?;
        } else {
            write!(f, "{}", ty)?;
        }
    }
    Ok(())
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let marker = if param.optional { "?" } else { "" };
            write!(f, "{}{}: {}", param.name, marker, param.ty)?;
        }
        write!(f, ") => {}", self.ret)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        if self.properties.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for prop in &self.properties {
            let marker = if prop.optional { "?" } else { "" };
            write!(f, "{}{}: {}; ", prop.name, marker, prop.ty)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, ty: Type) -> Property {
        Property {
            name: name.to_string(),
            ty,
            optional: false,
        }
    }

    #[test]
    fn test_display_object_literal() {
        let ty = Type::Object(ObjectType::anonymous(vec![
            prop("name", Type::String),
            Property {
                name: "age".to_string(),
                ty: Type::Number,
                optional: true,
            },
        ]));
        assert_eq!(ty.to_string(), "{ name: string; age?: number; }");
    }

    #[test]
    fn test_display_array_of_union() {
        let ty = Type::Array(Box::new(Type::union(vec![Type::String, Type::Number])));
        assert_eq!(ty.to_string(), "(string | number)[]");
    }

    #[test]
    fn test_display_function() {
        let ty = Type::Function(FunctionType {
            params: vec![Parameter {
                name: "x".to_string(),
                ty: Type::Number,
                optional: false,
            }],
            ret: Box::new(Type::Void),
            method: false,
        });
        assert_eq!(ty.to_string(), "(x: number) => void");
    }

    #[test]
    fn test_union_flattens_and_dedupes() {
        let ty = Type::union(vec![
            Type::String,
            Type::Union(vec![Type::String, Type::Null]),
        ]);
        assert_eq!(ty, Type::Union(vec![Type::String, Type::Null]));
        assert_eq!(Type::union(vec![Type::Number]), Type::Number);
    }

    #[test]
    fn test_widened_literals() {
        let ty = Type::union(vec![
            Type::StringLiteral("a".to_string()),
            Type::StringLiteral("b".to_string()),
        ]);
        assert_eq!(ty.widened(), Type::String);
    }
}
