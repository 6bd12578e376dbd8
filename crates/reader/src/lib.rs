//! qb-reader: the primitive byte reader (§4.1) and name-table resolver
//! (§4.2) shared by every dialect's opcode dispatcher.

pub mod name_table;
pub mod primitive;

pub use name_table::NameTable;
pub use primitive::ByteReader;
