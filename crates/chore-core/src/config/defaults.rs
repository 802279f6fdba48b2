//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "ChoreHub".to_string()
}

pub fn default_data_dir() -> String {
    "~/.chorehub".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_db_path() -> String {
    "~/.chorehub/data/chorehub.db".to_string()
}

pub fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_api_port() -> u16 {
    5050
}

pub fn default_timeliness_limit() -> usize {
    5
}
