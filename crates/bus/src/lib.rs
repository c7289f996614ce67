//! The Kafka-compatible partitioned-log bus adapter. One producer wrapper
//! and one generic consumer loop, shared by every component instead of each
//! reimplementing the fetch/handle/commit contract.

pub mod consumer;
pub mod error;
pub mod producer;
pub mod topics;

pub use consumer::{run_consumer, ConsumerConfig};
pub use error::BusError;
pub use producer::BusProducer;
pub use topics::{partition_key, CHECKS_REQUEST_TOPIC, STATUS_CHANGE_TOPIC};
