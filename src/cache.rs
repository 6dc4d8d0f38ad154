use parking_lot::Mutex;
use std::collections::HashMap;

/// The fixed cache slots the service reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    RecentAnnouncements,
    FeaturedSpeaker,
}

impl CacheKey {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::RecentAnnouncements => "RECENT_ANNOUNCEMENTS",
            CacheKey::FeaturedSpeaker => "FEATURED_SPEAKER",
        }
    }
}

/// Best-effort string cache; entries may vanish at any time.
pub trait AnnouncementCache: Send + Sync {
    fn get(&self, key: CacheKey) -> Option<String>;
    fn set(&self, key: CacheKey, value: String);
    fn delete(&self, key: CacheKey);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnouncementCache for MemoryCache {
    fn get(&self, key: CacheKey) -> Option<String> {
        self.entries.lock().get(&key).cloned()
    }

    fn set(&self, key: CacheKey, value: String) {
        self.entries.lock().insert(key, value);
    }

    fn delete(&self, key: CacheKey) {
        self.entries.lock().remove(&key);
    }
}
