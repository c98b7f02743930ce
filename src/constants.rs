pub const VK_API_BASE: &str = "https://api.vk.com/method";
pub const VK_API_VERSION: &str = "5.131";
pub const VK_DEFAULT_COUNT: i64 = 20;
pub const VK_MAX_COUNT: i64 = 200;
pub const VK_MIN_THUMB_HEIGHT: i64 = 240;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const YOUTUBE_DEFAULT_MAX_RESULTS: i64 = 12;
pub const YOUTUBE_MAX_RESULTS: i64 = 50;

pub const HTTP_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_STREAM_TITLE: &str = "Live broadcast";
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

// one point per full minute streamed, five per recorded viewer
pub const SECONDS_PER_POINT: i64 = 60;
pub const POINTS_PER_VIEWER: i64 = 5;
