mod batch;
mod list;
mod reconcile;
mod serve;
mod verify;

pub use batch::*;
pub use list::*;
pub use reconcile::*;
pub use serve::*;
pub use verify::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
