/// Single flat namespace; entries are told apart by key prefix.
pub const LOCAL_STORAGE: &str = "local_storage";
