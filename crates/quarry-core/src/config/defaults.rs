// Single source of truth for configuration defaults.

// --- Model ---
pub const DEFAULT_MODEL_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL_NAME: &str = "llama3.2:1b";
pub const DEFAULT_MODEL_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_MODEL_MAX_TOKENS: u32 = 512;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MODEL_MAX_OUTSTANDING: usize = 2;

// --- Retrieval ---
pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MIN_RELEVANCE: f64 = 0.0;
pub const DEFAULT_MAX_FRAGMENT_CHARS: usize = 1_200;
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 20;
pub const DEFAULT_RANK_CACHE_CAPACITY: u64 = 1_024;

// --- Dataset ---
pub const DEFAULT_DATASET_PATH: &str = "data/northwind.sqlite";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_ROWS: usize = 1_000;

// --- Batch ---
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_QUESTION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INCLUDE_TRACE: bool = false;

// --- Composer ---
pub const DEFAULT_MODEL_EXPLANATIONS: bool = false;

// --- Files ---
pub const PROJECT_CONFIG_FILE: &str = "quarry.toml";
pub const USER_CONFIG_DIR: &str = ".quarry";
