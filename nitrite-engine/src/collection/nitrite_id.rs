use crate::common::NO2;
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::ID_GENERATOR;
use std::fmt::{Debug, Display};

const MAX_VALUE: u64 = 10_000_000_000_000_000_000;
const MIN_VALUE: u64 = 1_000_000_000_000_000_000;

/// Unique, totally ordered document identifier.
///
/// Ids are 19 digit integers produced by a time ordered generator, so the
/// primary map iterates documents roughly in insertion order.
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
pub struct NitriteId {
    id_value: u64,
}

impl NitriteId {
    pub fn new() -> Self {
        NitriteId {
            id_value: ID_GENERATOR.get_id(),
        }
    }

    pub fn create_id(id_value: u64) -> NitriteResult<NitriteId> {
        NitriteId::valid_id(id_value)?;
        Ok(NitriteId { id_value })
    }

    pub fn id_value(&self) -> u64 {
        self.id_value
    }

    pub(crate) fn valid_id(id_value: u64) -> NitriteResult<()> {
        if id_value >= MAX_VALUE {
            log::error!("Id value {} is too large", id_value);
            return Err(NitriteError::new(
                &format!("Id value {} must be less than 10^19", id_value),
                ErrorKind::InvalidId,
            ));
        }
        if id_value < MIN_VALUE {
            log::error!("Id value {} is too small", id_value);
            return Err(NitriteError::new(
                &format!("Id value {} must be at least 10^18", id_value),
                ErrorKind::InvalidId,
            ));
        }
        Ok(())
    }
}

impl Default for NitriteId {
    fn default() -> Self {
        NitriteId::new()
    }
}

impl Debug for NitriteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]{}", self.id_value, NO2)
    }
}

impl Display for NitriteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]{}", self.id_value, NO2)
    }
}
