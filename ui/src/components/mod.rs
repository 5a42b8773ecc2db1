pub mod array_field;
pub mod fields;
pub mod form_view;
