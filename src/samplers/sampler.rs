use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::engine::EngineRef;

#[derive(Debug)]
pub enum SamplerError {
    Failed(String),
    Unavailable(&'static str),
    Io(std::io::Error),
    Panicked(String),
}

impl SamplerError {
    pub fn failed(message: impl Into<String>) -> Self {
        SamplerError::Failed(message.into())
    }
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::Failed(message) => write!(f, "{}", message),
            SamplerError::Unavailable(what) => write!(f, "{} is not available", what),
            SamplerError::Io(err) => write!(f, "io error: {}", err),
            SamplerError::Panicked(message) => write!(f, "sampler panicked: {}", message),
        }
    }
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SamplerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SamplerError {
    fn from(err: std::io::Error) -> Self {
        SamplerError::Io(err)
    }
}

/// Identity used to reject a second sampler of the same implementation.
///
/// Two kinds compare equal when their type ids match; the name is carried
/// along only for logs and configuration lookups.
#[derive(Clone, Copy, Debug)]
pub struct SamplerKind {
    type_id: TypeId,
    name: &'static str,
}

impl SamplerKind {
    pub fn of<T: ?Sized + 'static>() -> Self {
        SamplerKind {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path, e.g. `MemorySampler`.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for SamplerKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for SamplerKind {}

impl Hash for SamplerKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Something that measures a runtime quantity each time it is polled.
///
/// Returning an error from [`Sampler::poll`] removes the sampler from the set
/// it was polled from; it is not polled again for the lifetime of the engine.
pub trait Sampler: Send + Sync + 'static {
    fn poll(&self) -> Result<(), SamplerError>;

    fn kind(&self) -> SamplerKind {
        SamplerKind::of::<Self>()
    }

    fn id(&self) -> String {
        self.kind().short_name().to_string()
    }

    /// Called once when the sampler is accepted into one of the engine's sets.
    fn attach(&self, _engine: EngineRef) {}
}
