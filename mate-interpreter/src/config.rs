/// Where the environment installed on a single object is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStorage {
    /// On the object's layout: installing an environment transitions the object to another layout.
    InLayout,
    /// In a dedicated slot of the object itself.
    InObject,
}

/// The configuration of a universe, fixed at startup.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Whether nodes are compiled with interception checks.
    pub reflection_enabled: bool,
    /// Where per-object environments live.
    pub environment_storage: EnvironmentStorage,
    /// Whether semantic checks cache their decisions.
    pub optimized_semantic_checks: bool,
    /// Maximum length of a call site's dispatch chain before it goes megamorphic.
    pub inline_cache_size: usize,
    /// Number of uncached calls a call site performs before it starts caching.
    pub dispatch_warmup: usize,
    /// Number of environments (or layouts) a semantic check remembers.
    pub semantic_cache_size: usize,
    /// Number of (class, environment) pairs the object tier remembers once its layout cache is full.
    pub object_type_cache_size: usize,
    /// Number of environments the object tier remembers when environments live in objects.
    pub object_environment_cache_size: usize,
    /// Number of layouts a field accessor remembers.
    pub field_cache_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            reflection_enabled: true,
            environment_storage: EnvironmentStorage::InLayout,
            optimized_semantic_checks: true,
            inline_cache_size: 6,
            dispatch_warmup: 5,
            semantic_cache_size: 8,
            object_type_cache_size: 5,
            object_environment_cache_size: 6,
            field_cache_size: 6,
        }
    }
}

impl VmConfig {
    pub fn with_reflection(mut self, enabled: bool) -> Self {
        self.reflection_enabled = enabled;
        self
    }

    pub fn with_environment_storage(mut self, storage: EnvironmentStorage) -> Self {
        self.environment_storage = storage;
        self
    }

    pub fn with_optimized_semantic_checks(mut self, optimized: bool) -> Self {
        self.optimized_semantic_checks = optimized;
        self
    }

    pub fn with_inline_cache_size(mut self, size: usize) -> Self {
        self.inline_cache_size = size;
        self
    }

    pub fn with_dispatch_warmup(mut self, warmup: usize) -> Self {
        self.dispatch_warmup = warmup;
        self
    }

    pub fn with_semantic_cache_size(mut self, size: usize) -> Self {
        self.semantic_cache_size = size;
        self
    }
}
