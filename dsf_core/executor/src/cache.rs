use parking_lot::RwLock;
use planner::RemoteState;
use std::collections::HashMap;

/// Remote state per resource name, filled lazily and kept for one invocation.
///
/// Entries are never written back; any mutation of a resource must call
/// `invalidate` so the next lookup fetches fresh state.
#[derive(Debug, Default)]
pub struct StateCache {
    entries: RwLock<HashMap<String, RemoteState>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<RemoteState> {
        self.entries.read().get(name).cloned()
    }

    pub fn insert(&self, name: &str, state: RemoteState) {
        self.entries.write().insert(name.to_string(), state);
    }

    pub fn invalidate(&self, name: &str) {
        self.entries.write().remove(name);
    }

    /// Move an entry after a rename.
    pub fn rename(&self, from: &str, to: &str) {
        let mut entries = self.entries.write();
        entries.remove(to);
        if let Some(state) = entries.remove(from) {
            entries.insert(to.to_string(), state);
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner::PipelineStatus;

    #[test]
    fn invalidate_and_rename() {
        let cache = StateCache::new();
        let state = RemoteState {
            exists: true,
            pipeline_status: PipelineStatus::Running,
            ..Default::default()
        };
        cache.insert("a", state.clone());
        cache.rename("a", "b");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(state));

        cache.invalidate("b");
        assert!(cache.is_empty());
    }
}
