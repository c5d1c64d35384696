use std::collections::HashMap;

/// Flat `key = value` table used by robot parameter and collision model files.
/// `key: value` is accepted as well; `#` and `!` start comment lines.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = line.find(['=', ':']);
            let (key, value) = match split {
                Some(idx) => (&line[..idx], &line[idx + 1..]),
                None => (line, ""),
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Properties { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}
