//! Back-end registry for lookup and discovery.

use crate::backend::{DynTransformBackend, TransformBackend};
use crate::config::Domain;
use crate::ordered::Ordered;
use crate::radix2::Radix2Fft;
use crate::reference::ScalarReference;
use crate::vendor::RustFftBackend;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: Vec<DynTransformBackend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn with_default_backends() -> Self {
        let mut registry = Self::new();
        registry.register(ScalarReference::new());
        registry.register(RustFftBackend::new());
        registry.register(Radix2Fft::new());
        registry.register(Ordered::new("radix2", Radix2Fft::new()));
        registry
    }

    pub fn register<B>(&mut self, backend: B)
    where
        B: TransformBackend + 'static,
    {
        self.backends.push(Arc::new(backend));
    }

    pub fn backends(&self) -> &[DynTransformBackend] {
        &self.backends
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    pub fn find(&self, name: &str) -> Option<DynTransformBackend> {
        self.backends
            .iter()
            .find(|backend| backend.name() == name)
            .map(Arc::clone)
    }

    /// Keep only the back-ends for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&dyn TransformBackend) -> bool,
    {
        self.backends.retain(|backend| keep(backend.as_ref()));
    }

    /// Largest per-back-end minimum for `domain`: the smallest size every
    /// registered back-end can handle.
    pub fn min_size(&self, domain: Domain) -> usize {
        self.backends
            .iter()
            .map(|backend| backend.min_size(domain))
            .max()
            .unwrap_or(2)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
