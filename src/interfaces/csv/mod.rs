pub mod order_writer;
pub mod transaction_reader;
