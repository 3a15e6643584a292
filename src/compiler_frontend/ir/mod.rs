pub(crate) mod ir_builder;
pub(crate) mod ir_declarations;
pub(crate) mod ir_display;
pub(crate) mod ir_nodes;
pub(crate) mod ir_snapshot;
pub(crate) mod ir_types;
