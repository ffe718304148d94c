pub mod assess;
pub mod batch;
pub mod init;
pub mod list_models;
pub mod validate;
