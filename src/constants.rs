pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const NAME_MAX_LENGTH: usize = 200;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const TAG_COLOR_LENGTH: usize = 7;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list";
pub const SHOPPING_LIST_FILENAME: &str = "shopping-list.txt";

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

pub const INGREDIENT_CACHE_KEY: &str = "ingredients";
pub const TAG_CACHE_KEY: &str = "tags";
pub const REFERENCE_CACHE_TTL_SECONDS: u64 = 3600;
