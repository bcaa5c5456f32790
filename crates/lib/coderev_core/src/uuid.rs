// Review and ledger rows use UUIDv7 so ids sort by creation time.
// User ids stay random (v4): nothing orders by them.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new random UUIDv4.
pub fn uuidv4() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn uuidv7_is_monotonic() {
        let a = uuidv7();
        let b = uuidv7();
        assert!(b >= a);
    }

    #[test]
    fn uuidv4_is_random() {
        let id = uuidv4();
        assert_eq!(id.get_version(), Some(uuid::Version::Random));
        assert_ne!(id, uuidv4());
    }
}
