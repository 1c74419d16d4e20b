use std::collections::HashMap;
use std::rc::Rc;

pub(crate) struct AssetCache<T> {
    entries: HashMap<String, Rc<T>>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Rc<T>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, handle: Rc<T>) {
        self.entries.insert(key, handle);
    }

    // Removes the entry only while it still points at `handle`. A retry may
    // have replaced the entry since this handle was cached.
    pub fn remove_if_same(&mut self, key: &str, handle: &Rc<T>) {
        if let Some(current) = self.entries.get(key) {
            if Rc::ptr_eq(current, handle) {
                self.entries.remove(key);
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_the_shared_handle() {
        let mut cache = AssetCache::new();
        let handle = Rc::new("payload".to_string());
        cache.insert("a.png".to_string(), Rc::clone(&handle));

        let hit = cache.get("a.png").expect("cache hit");
        assert!(Rc::ptr_eq(&hit, &handle));
        assert!(cache.get("b.png").is_none());
        assert!(cache.contains("a.png"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_if_same_spares_a_replacement() {
        let mut cache = AssetCache::new();
        let stale = Rc::new("stale".to_string());
        let fresh = Rc::new("fresh".to_string());
        cache.insert("a.png".to_string(), Rc::clone(&stale));
        cache.insert("a.png".to_string(), Rc::clone(&fresh));

        cache.remove_if_same("a.png", &stale);
        assert!(cache.contains("a.png"));

        cache.remove_if_same("a.png", &fresh);
        assert!(!cache.contains("a.png"));
    }
}
