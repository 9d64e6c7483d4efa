/// Consecutive-tick confirmation of detection keys.
///
/// A key is confirmed once it has been seen on `min_consecutive` ticks in a
/// row, and only if it differs from the last confirmed key. Ticks without a
/// detection leave the counters untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Debouncer {
    last_key: Option<String>,
    consecutive: u32,
    last_confirmed: Option<String>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tick's key; returns the key when it becomes confirmed
    pub fn observe(&mut self, key: Option<&str>, min_consecutive: u32) -> Option<String> {
        let key = key?;

        if self.last_key.as_deref() == Some(key) {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 1;
            self.last_key = Some(key.to_string());
        }

        if self.consecutive >= min_consecutive.max(1) && self.last_confirmed.as_deref() != Some(key) {
            self.last_confirmed = Some(key.to_string());
            return Some(key.to_string());
        }

        None
    }

    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn last_confirmed(&self) -> Option<&str> {
        self.last_confirmed.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(keys: &[Option<&str>], min_consecutive: u32) -> Vec<(usize, String)> {
        let mut debouncer = Debouncer::new();
        keys.iter()
            .enumerate()
            .filter_map(|(i, key)| debouncer.observe(*key, min_consecutive).map(|k| (i + 1, k)))
            .collect()
    }

    #[test]
    fn test_confirms_after_consecutive_ticks() {
        let events = run(&[Some("A"), Some("A"), Some("A"), Some("B")], 3);
        assert_eq!(events, vec![(3, "A".to_string())]);
    }

    #[test]
    fn test_repeated_key_notifies_once() {
        let events = run(&[Some("A"); 8], 2);
        assert_eq!(events, vec![(2, "A".to_string())]);
    }

    #[test]
    fn test_missing_detection_keeps_counters() {
        let events = run(&[Some("A"), None, Some("A")], 2);
        assert_eq!(events, vec![(3, "A".to_string())]);
    }

    #[test]
    fn test_interruption_restarts_count() {
        let events = run(&[Some("A"), Some("B"), Some("A"), Some("A")], 2);
        assert_eq!(events, vec![(4, "A".to_string())]);
    }

    #[test]
    fn test_new_key_after_confirmation_is_confirmed() {
        let events = run(&[Some("A"), Some("B"), Some("A")], 1);
        assert_eq!(
            events,
            vec![(1, "A".to_string()), (2, "B".to_string()), (3, "A".to_string())]
        );
    }

    #[test]
    fn test_reset_forgets_confirmation() {
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.observe(Some("A"), 1).as_deref(), Some("A"));
        assert_eq!(debouncer.observe(Some("A"), 1), None);

        debouncer.reset();

        assert_eq!(debouncer.consecutive(), 0);
        assert_eq!(debouncer.observe(Some("A"), 1).as_deref(), Some("A"));
    }
}
