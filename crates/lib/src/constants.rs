//! # Shared Constants
//!
//! Default locations and tuning values shared by the library and the CLI.
//! Using these constants keeps the binary's configuration defaults and the
//! library's fallbacks in agreement.

/// Directory that receives one CSV file per extracted table.
pub const DEFAULT_CSV_DIR: &str = "csv_data";

/// Directory that receives one Parquet file per extracted table.
pub const DEFAULT_PARQUET_DIR: &str = "parquet_data";

/// Directory holding the persistent vector store.
pub const DEFAULT_STORE_DIR: &str = "vector_db";

/// File name of the SQLite database inside the store directory.
pub const STORE_DB_FILE: &str = "store.db";

/// Collection that row and schema documents are written to.
pub const DEFAULT_COLLECTION: &str = "table_rows";

/// On-disk cache of rendered answers.
pub const DEFAULT_CACHE_FILE: &str = "query_cache.json";

/// Number of documents embedded and inserted per batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Number of documents returned by a similarity search.
pub const DEFAULT_TOP_K: usize = 10;

/// Multiplier applied to `top_k` when the question names specific tables.
pub const DEFAULT_WIDEN_FACTOR: usize = 3;

/// The tables pulled from the warehouse when none are configured.
pub const DEFAULT_TABLES: [&str; 10] = [
    "Customers",
    "Products",
    "Stores",
    "Sales",
    "Employees",
    "Deliveries",
    "Suppliers",
    "Inventory",
    "Store_Issues",
    "Ratings",
];
