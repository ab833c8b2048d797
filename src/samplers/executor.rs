use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;

use super::sampler::{Sampler, SamplerError};
use super::set::{SamplerHandle, SamplerSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub polled: usize,
    pub removed: Vec<String>,
}

impl PollReport {
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Polls every sampler in `set` once, in registration order, and removes the
/// ones that fail.
///
/// The pass works on a snapshot, so samplers registered while it runs are
/// kept but not visited until the next pass.
pub fn poll(set: &SamplerSet) -> PollReport {
    let samplers = set.snapshot();
    let mut failed: Vec<SamplerHandle> = Vec::new();

    for sampler in &samplers {
        if let Err(err) = poll_isolated(sampler.as_ref()) {
            warn!("Removing {} from list: {}", sampler.id(), err);
            failed.push(SamplerHandle::clone(sampler));
        }
    }

    set.remove_all(&failed);

    PollReport {
        polled: samplers.len(),
        removed: failed.iter().map(|sampler| sampler.id()).collect(),
    }
}

fn poll_isolated(sampler: &dyn Sampler) -> Result<(), SamplerError> {
    match catch_unwind(AssertUnwindSafe(|| sampler.poll())) {
        Ok(result) => result,
        Err(payload) => Err(SamplerError::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
