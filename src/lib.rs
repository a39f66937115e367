pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod runner;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;
