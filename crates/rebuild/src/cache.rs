//! Single-flight cache of extracted source audio, keyed by resource id.
//!
//! Multiple clips routinely reference the same resource; extraction is
//! the most expensive engine primitive and must run exactly once per
//! resource per run. Concurrent renderers asking for the same id block
//! on one in-flight extraction instead of duplicating it. Keying is by
//! resource id, not clip: the cache is the one shared mutable structure
//! of the pipeline.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use retrack_common::{RetrackError, RetrackResult};
use retrack_engine::{AudioEngine, AudioHandle};

type ExtractCell = Arc<OnceLock<Result<AudioHandle, String>>>;

/// Concurrency-safe memoizing cache for `extract_audio`.
#[derive(Default)]
pub struct SourceCache {
    entries: Mutex<HashMap<String, ExtractCell>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the extracted audio for `resource_id`, extracting on first
    /// access. Later callers for the same id — including concurrent
    /// ones — get the memoized result; callers for other ids proceed
    /// independently.
    pub fn get_or_extract(
        &self,
        resource_id: &str,
        source_path: &Path,
        engine: &dyn AudioEngine,
    ) -> RetrackResult<AudioHandle> {
        let cell = {
            let mut entries = self.entries.lock().expect("source cache poisoned");
            entries.entry(resource_id.to_string()).or_default().clone()
        };

        // OnceLock serializes concurrent initializers for the same key;
        // the map lock is not held across the extraction itself.
        let result = cell.get_or_init(|| {
            tracing::debug!(resource_id, source = %source_path.display(), "Cache miss, extracting");
            engine.extract_audio(source_path).map_err(|e| e.to_string())
        });

        match result {
            Ok(handle) => Ok(handle.clone()),
            Err(message) => Err(RetrackError::engine(message.clone())),
        }
    }

    /// Number of resources with a started (or finished) extraction.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("source cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine stub that only counts extractions.
    struct CountingEngine {
        extracts: AtomicUsize,
        fail: bool,
    }

    impl CountingEngine {
        fn new(fail: bool) -> Self {
            Self {
                extracts: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl AudioEngine for CountingEngine {
        fn extract_audio(&self, source: &Path) -> RetrackResult<AudioHandle> {
            self.extracts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RetrackError::engine("decoder exploded"))
            } else {
                Ok(AudioHandle::new(source.with_extension("wav")))
            }
        }

        fn measure_duration(&self, _: &AudioHandle) -> RetrackResult<f64> {
            unimplemented!()
        }

        fn render(
            &self,
            _: &AudioHandle,
            _: &retrack_engine::RenderSpec,
        ) -> RetrackResult<AudioHandle> {
            unimplemented!()
        }

        fn pad_or_trim(&self, _: &AudioHandle, _: f64) -> RetrackResult<AudioHandle> {
            unimplemented!()
        }

        fn silence(&self, _: f64) -> RetrackResult<AudioHandle> {
            unimplemented!()
        }

        fn concat(&self, _: &[AudioHandle]) -> RetrackResult<AudioHandle> {
            unimplemented!()
        }

        fn mix_additive(
            &self,
            _: &AudioHandle,
            _: &AudioHandle,
            _: f64,
        ) -> RetrackResult<AudioHandle> {
            unimplemented!()
        }

        fn export(
            &self,
            _: &AudioHandle,
            _: &Path,
            _: retrack_engine::ExportFormat,
        ) -> RetrackResult<()> {
            unimplemented!()
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_same_resource_extracted_once() {
        let cache = SourceCache::new();
        let engine = CountingEngine::new(false);
        let path = PathBuf::from("/media/take1.mp4");

        for _ in 0..5 {
            cache.get_or_extract("res-a", &path, &engine).unwrap();
        }

        assert_eq!(engine.extracts.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_resources_extracted_independently() {
        let cache = SourceCache::new();
        let engine = CountingEngine::new(false);

        cache
            .get_or_extract("res-a", Path::new("/media/a.mp4"), &engine)
            .unwrap();
        cache
            .get_or_extract("res-b", Path::new("/media/b.mp4"), &engine)
            .unwrap();

        assert_eq!(engine.extracts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_extraction_is_memoized() {
        let cache = SourceCache::new();
        let engine = CountingEngine::new(true);
        let path = PathBuf::from("/media/bad.mp4");

        assert!(cache.get_or_extract("res-a", &path, &engine).is_err());
        assert!(cache.get_or_extract("res-a", &path, &engine).is_err());
        // The failure is cached too; no retry storm within a run.
        assert_eq!(engine.extracts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_requests_single_flight() {
        let cache = Arc::new(SourceCache::new());
        let engine = Arc::new(CountingEngine::new(false));
        let path = PathBuf::from("/media/shared.mp4");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let engine = Arc::clone(&engine);
                let path = path.clone();
                std::thread::spawn(move || {
                    cache.get_or_extract("res-a", &path, engine.as_ref()).unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.extracts.load(Ordering::SeqCst), 1);
    }
}
