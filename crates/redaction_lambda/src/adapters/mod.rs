pub mod log;
pub mod object_store;
pub mod origin;
pub mod response_writer;
