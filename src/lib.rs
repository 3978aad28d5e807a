pub mod ast;
pub mod backend;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod token;
