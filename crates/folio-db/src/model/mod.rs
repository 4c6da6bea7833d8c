pub mod document;
pub mod row;
pub mod session;
