/// Default input and output file names, resolved against the base directory.
pub const DEFAULT_ORDERS_FILE: &str = "orders.csv";
pub const DEFAULT_USERS_FILE: &str = "users.json";
pub const DEFAULT_RESTAURANTS_FILE: &str = "restaurants.sql";
pub const DEFAULT_OUTPUT_FILE: &str = "final_food_delivery_dataset.csv";
pub const DEFAULT_LOG_DIR: &str = "logs";

// Environment overrides
pub const ENV_BASE_DIR: &str = "DELIVERY_MERGE_BASE_DIR";
pub const ENV_OUTPUT_FILE: &str = "DELIVERY_MERGE_OUTPUT";

// Join keys
pub const USER_ID: &str = "user_id";
pub const RESTAURANT_ID: &str = "restaurant_id";

// Columns appended by each join
pub const USER_COLUMNS: [&str; 3] = ["name", "city", "membership"];
pub const RESTAURANT_COLUMNS: [&str; 2] = ["cuisine", "rating"];

// Restaurant dump record layout
pub const RESTAURANT_NAME: &str = "restaurant_name";
pub const CUISINE: &str = "cuisine";
pub const RATING: &str = "rating";

// Columns summarized by the report
pub const ORDER_DATE: &str = "order_date";
pub const TOTAL_AMOUNT: &str = "total_amount";
pub const MEMBERSHIP: &str = "membership";
pub const CITY: &str = "city";
