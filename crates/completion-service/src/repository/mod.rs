//! 数据访问层

mod memory;
mod traits;

pub use memory::InMemoryRepository;
#[cfg(test)]
pub use traits::MockProgressRepository;
pub use traits::ProgressRepository;
