use std::sync::{Arc, Mutex, MutexGuard};

use super::sampler::{Sampler, SamplerKind};

pub type SamplerHandle = Arc<dyn Sampler>;

/// Ordered collection of samplers with at most one entry per kind.
///
/// Shared between the registering threads and whoever runs poll passes over
/// it, so every access goes through the inner mutex. Kinds are stored next
/// to the handles so no sampler code runs while the lock is held, apart from
/// the accept hook passed to [`SamplerSet::insert_with`].
#[derive(Default)]
pub struct SamplerSet {
    entries: Mutex<Vec<Entry>>,
}

struct Entry {
    kind: SamplerKind,
    sampler: SamplerHandle,
}

impl SamplerSet {
    pub fn new() -> Self {
        SamplerSet {
            entries: Mutex::new(Vec::new()),
        }
    }

    // A sampler that panicked mid-pass must not take the set with it.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends `sampler` unless a sampler of the same kind is present.
    /// Returns whether it was inserted.
    pub(crate) fn insert(&self, sampler: SamplerHandle) -> bool {
        self.insert_with(sampler, |_| {})
    }

    /// Like [`SamplerSet::insert`], but runs `on_accept` after the kind check
    /// and before the push, under the same lock. A concurrent poll pass can
    /// never see the sampler before `on_accept` has returned.
    pub(crate) fn insert_with<F>(&self, sampler: SamplerHandle, on_accept: F) -> bool
    where
        F: FnOnce(&SamplerHandle),
    {
        let kind = sampler.kind();
        let mut entries = self.lock();
        if entries.iter().any(|entry| entry.kind == kind) {
            return false;
        }
        on_accept(&sampler);
        entries.push(Entry { kind, sampler });
        true
    }

    /// Drops every handle in `failed`, matching by identity so that a
    /// different instance of the same kind registered meanwhile survives.
    pub(crate) fn remove_all(&self, failed: &[SamplerHandle]) {
        if failed.is_empty() {
            return;
        }
        self.lock()
            .retain(|entry| !failed.iter().any(|gone| Arc::ptr_eq(&entry.sampler, gone)));
    }

    pub fn snapshot(&self) -> Vec<SamplerHandle> {
        self.lock().iter().map(|entry| SamplerHandle::clone(&entry.sampler)).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_kind(&self, kind: SamplerKind) -> bool {
        self.lock().iter().any(|entry| entry.kind == kind)
    }

    pub fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|sampler| sampler.id()).collect()
    }

    pub fn kinds(&self) -> Vec<SamplerKind> {
        self.lock().iter().map(|entry| entry.kind).collect()
    }
}

impl std::fmt::Debug for SamplerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerSet").field("ids", &self.ids()).finish()
    }
}
