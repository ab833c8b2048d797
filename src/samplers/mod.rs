mod executor;
mod sampler;
mod scheduler;
mod set;
#[cfg(test)]
mod tests;

pub use executor::{poll, PollReport};
pub use sampler::{Sampler, SamplerError, SamplerKind};
pub use scheduler::{BackgroundScheduler, POLL_PERIOD, SAMPLER_METRIC};
pub use set::{SamplerHandle, SamplerSet};
