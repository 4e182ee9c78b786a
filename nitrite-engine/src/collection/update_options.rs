/// Options for [`update`](crate::collection::NitriteCollection::update).
///
/// `insert_if_absent` inserts the update document when the filter matches
/// nothing. `just_once` stops after the first matching document.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    insert_if_absent: bool,
    just_once: bool,
}

impl UpdateOptions {
    pub fn new(insert_if_absent: bool, just_once: bool) -> Self {
        Self {
            insert_if_absent,
            just_once,
        }
    }

    pub fn is_insert_if_absent(&self) -> bool {
        self.insert_if_absent
    }

    pub fn is_just_once(&self) -> bool {
        self.just_once
    }
}

pub fn insert_if_absent() -> UpdateOptions {
    UpdateOptions::new(true, false)
}

pub fn just_once() -> UpdateOptions {
    UpdateOptions::new(false, true)
}
