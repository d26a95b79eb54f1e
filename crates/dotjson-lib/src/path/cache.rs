//! Process-wide cache of compiled paths.
//!
//! Keyed by the exact path string and bounded in size. Replacement is
//! best-effort random: on overflow an arbitrary resident entry is dropped, so
//! hot lookups never wait on an eviction scan. The cache is observable only
//! as speed; entries are owned by the cache and handed out as `Arc` clones.
use crate::error::PathSyntaxError;
use crate::path::CompiledPath;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

const CAPACITY: usize = 1024;

static CACHE: Lazy<DashMap<String, Arc<CompiledPath>>> = Lazy::new(DashMap::new);

/// Returns the compiled form of `path`, compiling and caching on miss.
/// Only successful compilations are cached.
pub(crate) fn compiled(path: &str) -> Result<Arc<CompiledPath>, PathSyntaxError> {
    if let Some(hit) = CACHE.get(path) {
        return Ok(Arc::clone(hit.value()));
    }
    let fresh = Arc::new(CompiledPath::compile(path)?);
    if CACHE.len() >= CAPACITY {
        let victim = CACHE.iter().next().map(|e| e.key().clone());
        if let Some(victim) = victim {
            CACHE.remove(&victim);
        }
    }
    CACHE.insert(path.to_owned(), Arc::clone(&fresh));
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_share_the_compiled_path() {
        let a = compiled("cache.test.path").unwrap();
        let b = compiled("cache.test.path").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn compile_failures_are_not_cached() {
        assert!(compiled("broken.#(x==1").is_err());
        assert!(compiled("broken.#(x==1").is_err());
    }
}
