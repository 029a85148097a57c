pub mod errors;
pub mod keys;
pub mod form_field;
pub mod aggregate;
pub mod capture;
pub mod page_key;

pub use aggregate::AggregateRecord;
pub use capture::Capture;
pub use form_field::FormField;
pub use page_key::page_key;
