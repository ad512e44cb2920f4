//! Type resolution and storage sizes.
//!
//! Named types are looked up in the program's type table. Storage is counted in
//! heap cells: every scalar and pointer takes exactly one cell.
use crate::error::ExecError;
use crate::ir::Type;
use num_traits::ToPrimitive;
use std::collections::BTreeMap;
use std::fmt;

/// Structural form of a type, with every named reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Void,
    Int(u32),
    /// The pointee stays unresolved, so a named type may point to itself.
    Pointer(Type),
    Array { len: u64, elem: Box<Layout> },
    Struct(Vec<Layout>),
}

impl Layout {
    /// Return the size of the type in cells.
    ///
    /// Aggregates take at least one cell, so even an empty struct gets its own
    /// address when allocated.
    pub fn size(&self) -> usize {
        match self {
            Layout::Void => 0,
            Layout::Int(_) | Layout::Pointer(_) => 1,
            Layout::Array { len, elem } => len
                .to_usize()
                .map_or(usize::MAX, |len| len.saturating_mul(elem.size()))
                .max(1),
            Layout::Struct(fields) => fields.iter().map(Layout::size).sum::<usize>().max(1),
        }
    }

    /// Offset in cells of field `index`, i.e. the summed size of all fields
    /// before it. Returns `None` if this is not a struct or the index is out of range.
    pub fn field_offset(&self, index: usize) -> Option<(usize, &Layout)> {
        match self {
            Layout::Struct(fields) => {
                let field = fields.get(index)?;
                Some((fields[..index].iter().map(Layout::size).sum(), field))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Void => f.write_str("void"),
            Layout::Int(bits) => write!(f, "i{bits}"),
            Layout::Pointer(inner) => write!(f, "{inner}*"),
            Layout::Array { len, elem } => write!(f, "[{len} x {elem}]"),
            Layout::Struct(fields) => {
                let fields: Vec<_> = fields.iter().map(Layout::to_string).collect();
                write!(f, "{{ {} }}", fields.join(", "))
            }
        }
    }
}

/// Resolves types against a type table.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    types: &'a BTreeMap<String, Type>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(types: &'a BTreeMap<String, Type>) -> Self {
        Self { types }
    }

    /// Resolve a type to its structural form.
    ///
    /// Returns [`ExecError::CyclicType`] when a named type contains itself by value
    /// and [`ExecError::UnknownType`] for names missing from the table.
    pub fn resolve(&self, ty: &Type) -> Result<Layout, ExecError> {
        self.resolve_with(ty, &mut Vec::new())
    }

    /// Size in cells of the resolved type.
    pub fn size_of(&self, ty: &Type) -> Result<usize, ExecError> {
        Ok(self.resolve(ty)?.size())
    }

    fn resolve_with(&self, ty: &Type, seen: &mut Vec<String>) -> Result<Layout, ExecError> {
        match ty {
            Type::Void => Ok(Layout::Void),
            Type::Int(bits) => Ok(Layout::Int(*bits)),
            Type::Pointer(inner) => Ok(Layout::Pointer((**inner).clone())),
            Type::Array { len, elem } => Ok(Layout::Array {
                len: *len,
                elem: Box::new(self.resolve_with(elem, seen)?),
            }),
            Type::Struct(fields) => fields
                .iter()
                .map(|field| self.resolve_with(field, seen))
                .collect::<Result<Vec<_>, _>>()
                .map(Layout::Struct),
            Type::Named(name) => {
                if let Some(start) = seen.iter().position(|n| n == name) {
                    let mut cycle = seen[start..].to_vec();
                    cycle.push(name.clone());
                    return Err(ExecError::CyclicType { cycle });
                }
                let target = self
                    .types
                    .get(name)
                    .ok_or_else(|| ExecError::UnknownType { name: name.clone() })?;
                seen.push(name.clone());
                let resolved = self.resolve_with(target, seen);
                seen.pop();
                resolved
            }
        }
    }
}
