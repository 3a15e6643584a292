//! IR construction.
//!
//! `ModuleBuilder` owns the module under construction (declarations, interned names,
//! function signatures). `FunctionBuilder` appends instructions to one function body,
//! computes result types, and keeps the use lists of every value up to date.
//!
//! Operands must already exist when an instruction is created, so every value is defined
//! before it is used and the def edges of a finished function are acyclic.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir::ir_declarations::DeclKind;
use crate::compiler_frontend::ir::ir_nodes::{
    BlockId, DebugVariable, DeclId, ForwardKind, FunctionId, InstId, InstKind, IrBlock,
    IrFunction, IrInstruction, IrModule, IrValue, LifetimeEndKind, Operand, StoreQualifier,
    ValueDef, ValueId,
};
use crate::compiler_frontend::ir::ir_types::IrType;
use crate::compiler_frontend::string_interning::StringId;
use crate::{ir_log, return_ir_error};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionSignature {
    pub decl_context: Option<DeclId>,
    pub is_thunk: bool,
    pub has_self_param: bool,
}

#[derive(Debug, Default)]
pub struct ModuleBuilder {
    module: IrModule,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> StringId {
        self.module.string_table.intern(name)
    }

    pub fn named_type(&mut self, name: &str) -> IrType {
        IrType::Named(self.intern(name))
    }

    pub fn declare(&mut self, name: &str, kind: DeclKind) -> DeclId {
        let name = self.intern(name);
        self.module.declarations.add(name, kind)
    }

    /// Declares a struct and its stored properties, in order.
    /// Returns the struct declaration and one declaration per field.
    pub fn declare_struct(&mut self, name: &str, fields: &[(&str, IrType)]) -> (DeclId, Vec<DeclId>) {
        let stored_properties = fields
            .iter()
            .map(|(field_name, ty)| self.declare(field_name, DeclKind::Field { ty: ty.clone() }))
            .collect::<Vec<_>>();

        let struct_decl = self.declare(
            name,
            DeclKind::Struct {
                stored_properties: stored_properties.clone(),
            },
        );

        (struct_decl, stored_properties)
    }

    /// Adds a function without a body. Bodies are added later through `function_builder`.
    pub fn declare_function(&mut self, name: &str, signature: FunctionSignature) -> FunctionId {
        let id = FunctionId(self.module.functions.len() as u32);
        let name = self.intern(name);

        self.module.functions.push(IrFunction {
            id,
            name,
            decl_context: signature.decl_context,
            is_thunk: signature.is_thunk,
            has_self_param: signature.has_self_param,
            arguments: Vec::new(),
            blocks: Vec::new(),
            instructions: Vec::new(),
            values: Vec::new(),
        });

        id
    }

    /// Starts the body of a function declared with `declare_function`.
    pub fn function_builder(&mut self, id: FunctionId) -> Result<FunctionBuilder<'_>, CompilerError> {
        let Some(declared) = self.module.function(id) else {
            return_ir_error!(format!("Cannot define a body for unknown function '{id}'"), {
                CompilationStage => "IR Construction",
            });
        };

        if !declared.is_declaration_only() {
            return_ir_error!(
                format!(
                    "Function '{}' already has a body",
                    self.module.resolve(declared.name)
                ),
                {
                    CompilationStage => "IR Construction",
                    FunctionName => self.module.resolve(declared.name),
                }
            );
        }

        let mut function = declared.clone();
        function.blocks.push(IrBlock {
            id: BlockId(0),
            instructions: Vec::new(),
        });

        Ok(FunctionBuilder {
            module: self,
            function,
            current_block: BlockId(0),
        })
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    pub fn finish(self) -> IrModule {
        self.module
    }
}

pub struct FunctionBuilder<'m> {
    module: &'m mut ModuleBuilder,
    function: IrFunction,
    current_block: BlockId,
}

impl FunctionBuilder<'_> {
    pub fn id(&self) -> FunctionId {
        self.function.id
    }

    pub fn module_builder(&mut self) -> &mut ModuleBuilder {
        self.module
    }

    pub fn add_argument(&mut self, ty: IrType, decl: Option<DeclId>) -> ValueId {
        let index = self.function.arguments.len();
        let id = self.new_value(ty, ValueDef::Argument { index, decl });
        self.function.arguments.push(id);
        id
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.function.blocks.len() as u32);
        self.function.blocks.push(IrBlock {
            id,
            instructions: Vec::new(),
        });
        id
    }

    pub fn set_block(&mut self, block: BlockId) -> Result<(), CompilerError> {
        if self.function.block(block).is_none() {
            return_ir_error!(format!("Unknown block '{block}'"), {
                CompilationStage => "IR Construction",
            });
        }

        self.current_block = block;
        Ok(())
    }

    pub fn value_type(&self, value: ValueId) -> Option<&IrType> {
        self.function.value_type(value)
    }

    // ------------------------------------------------------------
    // Allocations
    // ------------------------------------------------------------
    pub fn alloc_stack(
        &mut self,
        ty: IrType,
        decl: Option<DeclId>,
        debug_name: Option<&str>,
    ) -> Result<ValueId, CompilerError> {
        let debug_var = self.debug_variable(debug_name);
        self.single_result(
            InstKind::AllocStack { decl, debug_var },
            IrType::address_of(ty),
        )
    }

    pub fn alloc_box(
        &mut self,
        ty: IrType,
        decl: Option<DeclId>,
        debug_name: Option<&str>,
    ) -> Result<ValueId, CompilerError> {
        let debug_var = self.debug_variable(debug_name);
        self.single_result(
            InstKind::AllocBox { decl, debug_var },
            IrType::Box(Box::new(ty)),
        )
    }

    pub fn global_addr(&mut self, global: DeclId) -> Result<ValueId, CompilerError> {
        let ty = match self.module.module.declarations.get(global).map(|decl| &decl.kind) {
            Some(DeclKind::Global { ty }) => ty.clone(),
            _ => {
                return_ir_error!(format!("'{global}' is not a global declaration"), {
                    CompilationStage => "IR Construction",
                    ExpectedType => "global",
                });
            }
        };

        self.single_result(InstKind::GlobalAddr { global }, IrType::address_of(ty))
    }

    // ------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------
    pub fn struct_extract(&mut self, operand: ValueId, field: DeclId) -> Result<ValueId, CompilerError> {
        let ty = self.struct_field_type(operand, field, false)?;
        self.single_result(InstKind::StructExtract { operand, field }, ty)
    }

    pub fn struct_element_addr(
        &mut self,
        operand: ValueId,
        field: DeclId,
    ) -> Result<ValueId, CompilerError> {
        let ty = self.struct_field_type(operand, field, true)?;
        self.single_result(InstKind::StructElementAddr { operand, field }, ty)
    }

    pub fn tuple_extract(&mut self, operand: ValueId, index: usize) -> Result<ValueId, CompilerError> {
        let ty = self.tuple_element_type(operand, index, false)?;
        self.single_result(InstKind::TupleExtract { operand, index }, ty)
    }

    pub fn tuple_element_addr(
        &mut self,
        operand: ValueId,
        index: usize,
    ) -> Result<ValueId, CompilerError> {
        let ty = self.tuple_element_type(operand, index, true)?;
        self.single_result(InstKind::TupleElementAddr { operand, index }, ty)
    }

    /// Address of a stored property of a class instance.
    pub fn ref_element_addr(&mut self, operand: ValueId, field: DeclId) -> Result<ValueId, CompilerError> {
        self.operand_type(operand)?;
        let Some(field_ty) = self.module.module.declarations.field_type(field).cloned() else {
            return_ir_error!(format!("'{field}' is not a stored property"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
            });
        };

        self.single_result(
            InstKind::RefElementAddr { operand, field },
            IrType::address_of(field_ty),
        )
    }

    pub fn open_existential_addr(
        &mut self,
        operand: ValueId,
        opened: IrType,
    ) -> Result<ValueId, CompilerError> {
        self.expect_address(operand, "open_existential_addr")?;
        self.single_result(
            InstKind::OpenExistentialAddr { operand },
            IrType::address_of(opened),
        )
    }

    // ------------------------------------------------------------
    // Destructures
    // ------------------------------------------------------------
    pub fn destructure_tuple(&mut self, operand: ValueId) -> Result<Vec<ValueId>, CompilerError> {
        let operand_ty = self.operand_type(operand)?;
        let element_types = match operand_ty {
            IrType::Tuple(elements) => elements.clone(),
            _ => {
                return_ir_error!(format!("destructure_tuple of non tuple value {operand}"), {
                    CompilationStage => "IR Construction",
                    ValueName => operand.to_string(),
                    ExpectedType => "tuple",
                });
            }
        };

        let (_, results) = self.push_instruction(InstKind::DestructureTuple { operand }, element_types)?;
        Ok(results)
    }

    pub fn destructure_struct(&mut self, operand: ValueId) -> Result<Vec<ValueId>, CompilerError> {
        let operand_ty = self.operand_type(operand)?;
        let stored_properties = match operand_ty {
            IrType::Struct(decl) => match self.module.module.declarations.get(*decl).map(|d| &d.kind) {
                Some(DeclKind::Struct { stored_properties }) => stored_properties.clone(),
                _ => Vec::new(),
            },
            _ => {
                return_ir_error!(format!("destructure_struct of non struct value {operand}"), {
                    CompilationStage => "IR Construction",
                    ValueName => operand.to_string(),
                    ExpectedType => "struct",
                });
            }
        };

        let mut element_types = Vec::with_capacity(stored_properties.len());
        for field in stored_properties {
            match self.module.module.declarations.field_type(field) {
                Some(ty) => element_types.push(ty.clone()),
                None => {
                    return_ir_error!(format!("Struct member '{field}' is not a stored property"), {
                        CompilationStage => "IR Construction",
                        ValueName => operand.to_string(),
                    });
                }
            }
        }

        let (_, results) = self.push_instruction(InstKind::DestructureStruct { operand }, element_types)?;
        Ok(results)
    }

    // ------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------
    pub fn store(
        &mut self,
        src: ValueId,
        dest: ValueId,
        qualifier: StoreQualifier,
    ) -> Result<InstId, CompilerError> {
        self.operand_type(src)?;
        self.expect_address(dest, "store")?;
        let (inst, _) = self.push_instruction(InstKind::Store { src, dest, qualifier }, Vec::new())?;
        Ok(inst)
    }

    pub fn copy_addr(
        &mut self,
        src: ValueId,
        dest: ValueId,
        is_init_of_dest: bool,
    ) -> Result<InstId, CompilerError> {
        self.expect_address(src, "copy_addr")?;
        self.expect_address(dest, "copy_addr")?;
        let (inst, _) = self.push_instruction(
            InstKind::CopyAddr {
                src,
                dest,
                is_init_of_dest,
            },
            Vec::new(),
        )?;
        Ok(inst)
    }

    // ------------------------------------------------------------
    // Forwarding
    // ------------------------------------------------------------
    pub fn forward(&mut self, kind: ForwardKind, operand: ValueId) -> Result<ValueId, CompilerError> {
        let operand_ty = self.operand_type(operand)?.clone();

        let ty = match kind {
            _ if kind.is_memory_read() => match operand_ty {
                IrType::Address(inner) => *inner,
                _ => {
                    return_ir_error!(format!("{} of non address value {operand}", kind.opcode()), {
                        CompilationStage => "IR Construction",
                        ValueName => operand.to_string(),
                        ExpectedType => "address",
                    });
                }
            },
            ForwardKind::ProjectBox => match operand_ty {
                IrType::Box(inner) => IrType::Address(inner),
                _ => {
                    return_ir_error!(format!("project_box of non box value {operand}"), {
                        CompilationStage => "IR Construction",
                        ValueName => operand.to_string(),
                        ExpectedType => "box",
                    });
                }
            },
            _ => operand_ty,
        };

        self.single_result(InstKind::Forward { kind, operand }, ty)
    }

    pub fn load(&mut self, operand: ValueId) -> Result<ValueId, CompilerError> {
        self.forward(ForwardKind::Load, operand)
    }

    pub fn begin_access(&mut self, operand: ValueId) -> Result<ValueId, CompilerError> {
        self.forward(ForwardKind::BeginAccess, operand)
    }

    // ------------------------------------------------------------
    // Callees and calls
    // ------------------------------------------------------------
    pub fn function_ref(&mut self, function: FunctionId) -> Result<ValueId, CompilerError> {
        let has_self_param = if function == self.function.id {
            self.function.has_self_param
        } else {
            match self.module.module.function(function) {
                Some(callee) => callee.has_self_param,
                None => {
                    return_ir_error!(format!("function_ref to unknown function '{function}'"), {
                        CompilationStage => "IR Construction",
                    });
                }
            }
        };

        self.single_result(
            InstKind::FunctionRef { function },
            IrType::Function { has_self_param },
        )
    }

    /// A dynamically dispatched method reference (class or witness method).
    pub fn method(&mut self, member: Option<DeclId>, has_self_param: bool) -> Result<ValueId, CompilerError> {
        self.single_result(InstKind::Method { member }, IrType::Function { has_self_param })
    }

    pub fn apply(
        &mut self,
        callee: ValueId,
        arguments: Vec<ValueId>,
        result_ty: IrType,
    ) -> Result<ValueId, CompilerError> {
        self.expect_function(callee)?;
        self.single_result(InstKind::Apply { callee, arguments }, result_ty)
    }

    /// Starts a coroutine. Returns the yielded values followed by the coroutine token.
    pub fn begin_apply(
        &mut self,
        callee: ValueId,
        arguments: Vec<ValueId>,
        yield_types: Vec<IrType>,
    ) -> Result<Vec<ValueId>, CompilerError> {
        self.expect_function(callee)?;
        let mut result_types = yield_types;
        result_types.push(IrType::Token);

        let (_, results) = self.push_instruction(InstKind::BeginApply { callee, arguments }, result_types)?;
        Ok(results)
    }

    pub fn partial_apply(
        &mut self,
        callee: ValueId,
        arguments: Vec<ValueId>,
    ) -> Result<ValueId, CompilerError> {
        self.expect_function(callee)?;
        self.single_result(
            InstKind::PartialApply { callee, arguments },
            IrType::Function {
                has_self_param: false,
            },
        )
    }

    // ------------------------------------------------------------
    // Raw pointers
    // ------------------------------------------------------------
    pub fn pointer_to_address(&mut self, operand: ValueId, pointee: IrType) -> Result<ValueId, CompilerError> {
        self.operand_type(operand)?;
        self.single_result(
            InstKind::PointerToAddress { operand },
            IrType::address_of(pointee),
        )
    }

    pub fn address_to_pointer(&mut self, operand: ValueId) -> Result<ValueId, CompilerError> {
        self.expect_address(operand, "address_to_pointer")?;
        self.single_result(InstKind::AddressToPointer { operand }, IrType::RawPointer)
    }

    // ------------------------------------------------------------
    // Everything else
    // ------------------------------------------------------------
    pub fn debug_value(&mut self, operand: ValueId, name: &str) -> Result<InstId, CompilerError> {
        self.operand_type(operand)?;
        let var = DebugVariable {
            name: self.module.intern(name),
        };
        let (inst, _) = self.push_instruction(InstKind::DebugValue { operand, var }, Vec::new())?;
        Ok(inst)
    }

    pub fn lifetime_end(&mut self, kind: LifetimeEndKind, operand: ValueId) -> Result<InstId, CompilerError> {
        self.operand_type(operand)?;
        let (inst, _) = self.push_instruction(InstKind::LifetimeEnd { kind, operand }, Vec::new())?;
        Ok(inst)
    }

    pub fn return_value(&mut self, operand: ValueId) -> Result<InstId, CompilerError> {
        self.operand_type(operand)?;
        let (inst, _) = self.push_instruction(InstKind::Return { operand }, Vec::new())?;
        Ok(inst)
    }

    pub fn opaque(
        &mut self,
        name: &str,
        operands: Vec<ValueId>,
        result_types: Vec<IrType>,
    ) -> Result<Vec<ValueId>, CompilerError> {
        let name = self.module.intern(name);
        let (_, results) = self.push_instruction(InstKind::Opaque { name, operands }, result_types)?;
        Ok(results)
    }

    /// Installs the body into the module.
    pub fn finish(self) -> FunctionId {
        let id = self.function.id;
        ir_log!(format!(
            "[IR] Finished function {}: blocks={} instructions={} values={}",
            self.module.module.resolve(self.function.name),
            self.function.blocks.len(),
            self.function.instructions.len(),
            self.function.values.len()
        ));

        self.module.module.functions[id.0 as usize] = self.function;
        id
    }

    // ------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------
    fn debug_variable(&mut self, debug_name: Option<&str>) -> Option<DebugVariable> {
        debug_name.map(|name| DebugVariable {
            name: self.module.intern(name),
        })
    }

    fn new_value(&mut self, ty: IrType, def: ValueDef) -> ValueId {
        let id = ValueId(self.function.values.len() as u32);
        self.function.values.push(IrValue {
            id,
            ty,
            def,
            uses: Vec::new(),
        });
        id
    }

    fn single_result(&mut self, kind: InstKind, ty: IrType) -> Result<ValueId, CompilerError> {
        let (_, results) = self.push_instruction(kind, vec![ty])?;
        Ok(results[0])
    }

    fn push_instruction(
        &mut self,
        kind: InstKind,
        result_types: Vec<IrType>,
    ) -> Result<(InstId, Vec<ValueId>), CompilerError> {
        let operands = kind.operands();
        for operand in &operands {
            self.operand_type(*operand)?;
        }

        let inst = InstId(self.function.instructions.len() as u32);
        for (operand_index, operand) in operands.into_iter().enumerate() {
            self.function.values[operand.0 as usize].uses.push(Operand {
                user: inst,
                operand_index,
            });
        }

        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| self.new_value(ty, ValueDef::Result { inst, index }))
            .collect::<Vec<_>>();

        self.function.instructions.push(IrInstruction {
            id: inst,
            block: self.current_block,
            kind,
            results: results.clone(),
        });
        self.function.blocks[self.current_block.0 as usize]
            .instructions
            .push(inst);

        Ok((inst, results))
    }

    fn operand_type(&self, operand: ValueId) -> Result<&IrType, CompilerError> {
        match self.function.value_type(operand) {
            Some(ty) => Ok(ty),
            None => {
                return_ir_error!(
                    format!(
                        "Operand {operand} is not defined in function '{}'",
                        self.module.module.resolve(self.function.name)
                    ),
                    {
                        CompilationStage => "IR Construction",
                        ValueName => operand.to_string(),
                        FunctionName => self.module.module.resolve(self.function.name),
                    }
                );
            }
        }
    }

    fn expect_address(&self, operand: ValueId, opcode: &str) -> Result<(), CompilerError> {
        if !self.operand_type(operand)?.is_address() {
            return_ir_error!(format!("{opcode} expects {operand} to be an address"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
                ExpectedType => "address",
            });
        }

        Ok(())
    }

    fn expect_function(&self, callee: ValueId) -> Result<(), CompilerError> {
        if !self.operand_type(callee)?.is_function() {
            return_ir_error!(format!("Callee {callee} is not a function value"), {
                CompilationStage => "IR Construction",
                ValueName => callee.to_string(),
                ExpectedType => "function",
            });
        }

        Ok(())
    }

    fn tuple_element_type(
        &self,
        operand: ValueId,
        index: usize,
        address: bool,
    ) -> Result<IrType, CompilerError> {
        let operand_ty = self.operand_type(operand)?;
        if operand_ty.is_address() != address {
            let expected = if address { "address" } else { "object" };
            return_ir_error!(format!("Tuple projection of {operand} expects an {expected}"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
                ExpectedType => expected,
            });
        }

        let Some(elements) = operand_ty.tuple_elements() else {
            return_ir_error!(format!("Tuple projection of non tuple value {operand}"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
                ExpectedType => "tuple",
            });
        };

        let Some(element) = elements.get(index) else {
            return_ir_error!(
                format!(
                    "Tuple index {index} is out of range for {operand} with {} elements",
                    elements.len()
                ),
                {
                    CompilationStage => "IR Construction",
                    ValueName => operand.to_string(),
                }
            );
        };

        Ok(operand_ty.rewrap_projection(element.clone()))
    }

    fn struct_field_type(
        &self,
        operand: ValueId,
        field: DeclId,
        address: bool,
    ) -> Result<IrType, CompilerError> {
        let operand_ty = self.operand_type(operand)?;
        if operand_ty.is_address() != address {
            let expected = if address { "address" } else { "object" };
            return_ir_error!(format!("Struct projection of {operand} expects an {expected}"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
                ExpectedType => expected,
            });
        }

        let declarations = &self.module.module.declarations;
        let is_member = operand_ty
            .struct_decl()
            .and_then(|decl| declarations.get(decl))
            .is_some_and(|decl| match &decl.kind {
                DeclKind::Struct { stored_properties } => stored_properties.contains(&field),
                _ => false,
            });

        if !is_member {
            return_ir_error!(format!("'{field}' is not a stored property of the type of {operand}"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
                DeclarationName => self.module.module.decl_name(Some(field)),
            });
        }

        let Some(field_ty) = declarations.field_type(field) else {
            return_ir_error!(format!("'{field}' has no stored type"), {
                CompilationStage => "IR Construction",
                ValueName => operand.to_string(),
            });
        };

        Ok(operand_ty.rewrap_projection(field_ty.clone()))
    }
}
