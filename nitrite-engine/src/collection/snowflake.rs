use crate::common::current_time_millis;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;

const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_LEFT_SHIFT: u64 = SEQUENCE_BITS + NODE_ID_BITS;
const EPOCH: u64 = 1288834974657;

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Time ordered 64 bit id generator.
///
/// Ids from one generator are strictly increasing: within a millisecond the
/// sequence advances, and when it wraps the generator waits for the next
/// millisecond. A clock that moves backwards is treated as still being at
/// the last observed millisecond.
pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: Mutex<GeneratorState>,
}

impl SnowflakeIdGenerator {
    pub fn new() -> Self {
        let node_id = OsRng.gen_range(0..=MAX_NODE_ID);
        log::info!("Initialized id generator with node id: {}", node_id);
        SnowflakeIdGenerator {
            node_id,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    pub fn get_id(&self) -> u64 {
        let mut state = self.state.lock();
        let mut timestamp = (current_time_millis() as u64).max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                while timestamp <= state.last_timestamp {
                    std::hint::spin_loop();
                    timestamp = (current_time_millis() as u64).max(state.last_timestamp);
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        ((timestamp - EPOCH) << TIMESTAMP_LEFT_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
