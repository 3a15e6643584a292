//! Declarations referenced by the IR.
//!
//! These stand in for the language's declaration model:
//! the IR only ever needs a printable name and, for a few kinds, a link to another declaration.

use crate::compiler_frontend::ir::ir_nodes::DeclId;
use crate::compiler_frontend::ir::ir_types::IrType;
use crate::compiler_frontend::string_interning::{StringId, StringTable};

/// Rendered whenever a name has to come from a declaration that does not exist.
pub const UNKNOWN_DECL_NAME: &str = "<unknown decl>";

#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub name: StringId,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Variable,
    Parameter,
    Global { ty: IrType },

    /// A stored property of a struct or class.
    Field { ty: IrType },

    /// Stored properties in declaration order.
    /// Destructuring a struct produces one result per stored property, in this order.
    Struct { stored_properties: Vec<DeclId> },

    /// A getter, setter, modify coroutine or addressor of some storage.
    Accessor { storage: DeclId },

    Function,
}

#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    declarations: Vec<Declaration>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: StringId, kind: DeclKind) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        self.declarations.push(Declaration { id, name, kind });
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// The user facing name of a declaration.
    /// Accessors are named after the storage they access.
    pub fn display_name<'a>(&self, id: Option<DeclId>, string_table: &'a StringTable) -> &'a str {
        let Some(decl) = id.and_then(|id| self.get(id)) else {
            return UNKNOWN_DECL_NAME;
        };

        let named = match &decl.kind {
            DeclKind::Accessor { storage } => match self.get(*storage) {
                Some(storage) => storage,
                None => return UNKNOWN_DECL_NAME,
            },
            _ => decl,
        };

        string_table.resolve(named.name)
    }

    /// Stored property at `index` of the struct declaration `struct_decl`.
    pub fn stored_property(&self, struct_decl: DeclId, index: usize) -> Option<DeclId> {
        match &self.get(struct_decl)?.kind {
            DeclKind::Struct { stored_properties } => stored_properties.get(index).copied(),
            _ => None,
        }
    }

    pub fn field_type(&self, field: DeclId) -> Option<&IrType> {
        match &self.get(field)?.kind {
            DeclKind::Field { ty } | DeclKind::Global { ty } => Some(ty),
            _ => None,
        }
    }
}
