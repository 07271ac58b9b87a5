pub mod hash;
pub mod record;

pub use hash::{HashKind, Hashes};
pub use record::{DumpStatus, Machine, Record, RecordKind, Source};
