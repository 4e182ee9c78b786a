mod find_test;
mod property_test;
mod sort_test;
