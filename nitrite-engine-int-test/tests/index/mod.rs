mod build_test;
mod index_test;
mod text_index_test;
