use crc32fast::Hasher;

/// Derive a short, stable seed from an editor instance name using CRC32
pub fn get_editor_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for tokens within one editor
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(name: &str) -> Self {
        Self {
            seed: get_editor_seed(name),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential token ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("querybar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(get_editor_seed("search"), get_editor_seed("search"));
        assert_ne!(get_editor_seed("search"), get_editor_seed("filters"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("search");

        let id1 = gen.new_id();
        let id2 = gen.new_id();

        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id1.starts_with(gen.seed()));
    }

    #[test]
    fn test_same_seed_replays_same_ids() {
        let mut a = IdGenerator::from_seed("abc".to_string());
        let mut b = IdGenerator::from_seed("abc".to_string());
        assert_eq!(a.new_id(), b.new_id());
        assert_eq!(a.new_id(), b.new_id());
    }
}
