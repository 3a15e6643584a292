pub(crate) mod name_inference;
