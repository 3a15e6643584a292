
mod name_inference_property_tests;
mod use_def_walker_tests;
