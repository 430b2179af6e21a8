mod pool;
mod slot;
mod worker;

pub use pool::WorkerPool;
pub use slot::Task;
