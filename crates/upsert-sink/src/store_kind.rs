//! Store backend selection.
//!
//! Provides the `StoreKind` enum for choosing between the in-memory and
//! filesystem upsert stores.

/// Upsert store backend.
///
/// The CLI entry point branches once on this value, and all subsequent code
/// is monomorphized for the chosen store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Tables live in process memory and vanish on exit.
    Memory,
    /// One JSON file per table under a directory.
    Filesystem,
}

impl Default for StoreKind {
    fn default() -> Self {
        Self::Memory
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Filesystem => write!(f, "filesystem"),
        }
    }
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "filesystem" | "fs" | "file" => Ok(Self::Filesystem),
            _ => Err(anyhow::anyhow!(
                "Invalid store: '{s}'. Expected 'memory' or 'filesystem'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        assert_eq!(StoreKind::default(), StoreKind::Memory);
    }

    #[test]
    fn test_display() {
        assert_eq!(StoreKind::Memory.to_string(), "memory");
        assert_eq!(StoreKind::Filesystem.to_string(), "filesystem");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("MEM".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("fs".parse::<StoreKind>().unwrap(), StoreKind::Filesystem);
        assert_eq!(
            "Filesystem".parse::<StoreKind>().unwrap(),
            StoreKind::Filesystem
        );
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("postgres".parse::<StoreKind>().is_err());
        assert!("".parse::<StoreKind>().is_err());
    }
}
