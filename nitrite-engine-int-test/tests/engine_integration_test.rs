mod collection;
mod event;
mod index;
mod query;

#[ctor::ctor]
fn init() {
    colog::init();
}
