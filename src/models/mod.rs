pub mod component;
pub mod error;
pub mod exit_code;
pub mod ids;
pub mod instruction;
pub mod issue;
