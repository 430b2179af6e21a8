mod init;
mod kernel;
mod matrices;
mod mlp;
mod samples;
mod topology;

pub use init::WeightInit;
pub use kernel::{Kernel, Pass};
pub use matrices::Matrices;
pub use mlp::Mlp;
pub use samples::Samples;
pub use topology::Topology;
