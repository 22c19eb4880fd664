pub mod named;
pub mod smart_handle;
