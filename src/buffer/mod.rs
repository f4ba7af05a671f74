pub mod batch;
pub mod size;

pub use batch::ChronologicalBatch;
pub use size::{
    DATA_AMOUNT_LIMIT, EVENT_SIZE_LIMIT, FIXED_OVERHEAD, MAX_BATCH_SIZE, batch_cost, chunk_record,
    chunk_record_with_limit, record_cost,
};
