//! Unit tests for bytecode_stream components

mod test_handlers;
