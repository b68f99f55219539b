pub mod message_cache;
pub mod ring_buffer;

pub use message_cache::MessageCache;
pub use ring_buffer::RingBuffer;
