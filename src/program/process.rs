use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Cooperative kill flag, checked by every library call
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bookkeeping for one started user thread
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub id: i32,
    pub name: String,
    pub token: CancelToken,
    finished: Arc<AtomicBool>,
}

impl ProcessInfo {
    pub fn new(id: i32, name: &str) -> Self {
        ProcessInfo {
            id,
            name: name.to_string(),
            token: CancelToken::new(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Thread name shown in diagnostics
    pub fn thread_name(&self) -> String {
        format!("User Thread #{} ({})", self.id, self.name)
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }
}

/// Live user threads, in start order
#[derive(Debug, Default)]
pub struct ProcessTable {
    next_id: AtomicI32,
    entries: Mutex<Vec<ProcessInfo>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        ProcessTable::default()
    }

    /// Ids are never reused within a run
    pub fn allocate(&self, name: &str) -> ProcessInfo {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        ProcessInfo::new(id, name)
    }

    pub fn insert(&self, info: ProcessInfo) {
        self.entries.lock().push(info);
    }

    /// Signals and forgets the process; false if no such id is tracked
    pub fn kill(&self, id: i32) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|p| p.id == id) {
            Some(idx) => {
                entries.remove(idx).token.cancel();
                true
            }
            None => false,
        }
    }

    /// Signals every process except `keep`, leaving the table empty apart from it
    pub fn kill_all_except(&self, keep: Option<i32>) {
        self.entries.lock().retain(|p| {
            if Some(p.id) == keep {
                return true;
            }
            p.token.cancel();
            false
        });
    }

    pub fn kill_all(&self) {
        self.kill_all_except(None);
    }

    pub fn is_alive(&self, id: i32) -> bool {
        self.entries.lock().iter().any(|p| p.id == id && p.is_alive())
    }

    /// Ids of tracked processes whose threads are still running
    pub fn running_ids(&self) -> Vec<i32> {
        self.entries
            .lock()
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.id)
            .collect()
    }

    /// Drops finished entries; true while any remain
    pub fn prune(&self) -> bool {
        let mut entries = self.entries.lock();
        entries.retain(ProcessInfo::is_alive);
        !entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let table = ProcessTable::new();
        let a = table.allocate("main");
        let b = table.allocate("helper");
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
        assert_eq!(b.thread_name(), "User Thread #1 (helper)");
    }

    #[test]
    fn test_kill_signals_and_removes() {
        let table = ProcessTable::new();
        let info = table.allocate("loop");
        let token = info.token.clone();
        table.insert(info);
        assert_eq!(table.running_ids(), vec![0]);
        assert!(table.kill(0));
        assert!(token.is_cancelled());
        assert!(!table.kill(0));
        assert!(table.running_ids().is_empty());
    }

    #[test]
    fn test_kill_all_except_keeps_one() {
        let table = ProcessTable::new();
        let infos: Vec<ProcessInfo> = (0..3).map(|_| table.allocate("p")).collect();
        for info in &infos {
            table.insert(info.clone());
        }
        table.kill_all_except(Some(1));
        assert!(infos[0].token.is_cancelled());
        assert!(!infos[1].token.is_cancelled());
        assert!(infos[2].token.is_cancelled());
        assert_eq!(table.running_ids(), vec![1]);
    }

    #[test]
    fn test_prune_drops_finished() {
        let table = ProcessTable::new();
        let info = table.allocate("short");
        table.insert(info.clone());
        assert!(table.prune());
        info.mark_finished();
        assert!(!table.is_alive(info.id));
        assert!(!table.prune());
    }
}
