//! Process-wide memo of compiled patterns

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::compiler::TRegexCompiler;
use crate::error::Result;
use crate::flags::{RegexFlags, RegexSource};
use crate::CompiledRegex;

type Slot = Arc<OnceLock<Result<Arc<CompiledRegex>>>>;

/// Compiles every `(pattern, flags)` pair at most once, errors included.
///
/// The map lock is only held to find or insert the slot; compilation runs outside of it, so
/// concurrent first uses of one pattern wait for each other while other patterns proceed.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiler: TRegexCompiler,
    entries: Mutex<FxHashMap<RegexSource, Slot>>,
}

impl RegexCache {
    pub fn new(compiler: TRegexCompiler) -> Self {
        Self {
            compiler,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn get_or_compile(&self, pattern: &str, flags: &str) -> Result<Arc<CompiledRegex>> {
        let flags = RegexFlags::parse(flags)?;
        self.get_or_compile_source(&RegexSource::new(pattern, flags))
    }

    pub fn get_or_compile_source(&self, source: &RegexSource) -> Result<Arc<CompiledRegex>> {
        let slot = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(source.clone()).or_default())
        };
        slot.get_or_init(|| self.compiler.compile(source).map(Arc::new))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_compiles_once() {
        let cache = RegexCache::default();
        let first = cache.get_or_compile("a+b", "g").unwrap();
        let second = cache.get_or_compile("a+b", "g").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let other_flags = cache.get_or_compile("a+b", "i").unwrap();
        assert!(!Arc::ptr_eq(&first, &other_flags));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_cached() {
        let cache = RegexCache::default();
        assert!(cache.get_or_compile("(", "").is_err());
        assert!(cache.get_or_compile("(", "").is_err());
        assert_eq!(cache.len(), 1);
        // invalid flags never reach the map
        assert!(cache.get_or_compile("a", "gg").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_use() {
        let cache = Arc::new(RegexCache::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_compile("(a|b)*c", "").unwrap())
            })
            .collect();
        let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(compiled.iter().all(|c| Arc::ptr_eq(c, &compiled[0])));
    }
}
