//! SQLite-backed registry of service identities, ports, and endpoints
//! (spec §4.1, §5, §6).

mod duration;
mod port_allocator;
mod registry;
mod schema;

pub use duration::parse_duration_ms;
pub use port_allocator::PortAllocator;
pub use registry::ServiceRegistry;
