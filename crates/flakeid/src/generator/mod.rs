mod lock;
mod mutex;
mod state;
mod status;
#[cfg(test)]
mod tests;

pub use lock::*;
pub(crate) use mutex::*;
pub use state::*;
pub use status::*;
