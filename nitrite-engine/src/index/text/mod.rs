mod tokenizer;

pub use tokenizer::*;
