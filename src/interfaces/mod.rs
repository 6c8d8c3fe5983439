//! Batch I/O for the replay binary.

pub mod csv;
