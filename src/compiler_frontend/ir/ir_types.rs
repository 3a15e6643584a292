use crate::compiler_frontend::ir::ir_nodes::DeclId;
use crate::compiler_frontend::string_interning::StringId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// Any nominal type the engine does not need to look inside (Int, String, classes).
    Named(StringId),

    Tuple(Vec<IrType>),

    /// Struct type, identified by its struct declaration.
    Struct(DeclId),

    /// Function values. Methods and accessors carry a self parameter.
    Function { has_self_param: bool },

    RawPointer,

    /// The address of a value of the inner type.
    Address(Box<IrType>),

    /// A heap box holding a value of the inner type.
    Box(Box<IrType>),

    /// The token result of a coroutine begin.
    Token,
}

impl IrType {
    pub fn address_of(ty: IrType) -> IrType {
        IrType::Address(Box::new(ty))
    }

    pub fn is_address(&self) -> bool {
        matches!(self, IrType::Address(_))
    }

    /// The type stored behind an address, or the type itself for objects.
    pub fn object_type(&self) -> &IrType {
        match self {
            IrType::Address(inner) => inner,
            other => other,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.object_type(), IrType::Function { .. })
    }

    pub fn has_self_param(&self) -> bool {
        matches!(
            self.object_type(),
            IrType::Function {
                has_self_param: true
            }
        )
    }

    pub fn tuple_elements(&self) -> Option<&[IrType]> {
        match self.object_type() {
            IrType::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn struct_decl(&self) -> Option<DeclId> {
        match self.object_type() {
            IrType::Struct(decl) => Some(*decl),
            _ => None,
        }
    }

    /// Wraps a projected element type the same way this type is wrapped,
    /// so address projections produce addresses and value projections produce values.
    pub fn rewrap_projection(&self, element: IrType) -> IrType {
        if self.is_address() {
            IrType::address_of(element)
        } else {
            element
        }
    }
}
