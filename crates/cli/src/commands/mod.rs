pub mod aliases;
pub mod resolve;
pub mod table;
