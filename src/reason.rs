//! Bilingual denial-reason formatting.
//!
//! Templates and wait-time coarsening mirror the literal text contract: reason
//! strings are part of the external interface and must not be paraphrased.

const TOKEN_BUCKET_EN: &str =
    "System processing capacity is {rate} requests per second, please try again in {wait}";
const TOKEN_BUCKET_CN: &str = "当前系统处理能力为每秒{rate}个请求，请{wait}后再试";

const WINDOW_EN: &str =
    "Maximum {max_requests} requests allowed in {time}, {count} used, please try again in {wait}";
const WINDOW_CN: &str = "当前{time}内最多允许{max_requests}次请求，已使用{count}次，请{wait}后再试";

const LEAKY_BUCKET_EN: &str = "System processing capacity is {rate} requests per second, queue is full, please try again in {wait}";
const LEAKY_BUCKET_CN: &str = "当前系统处理能力为每秒{rate}个请求，队列已满，请{wait}后再试";

const MULTIPLE_BUCKETS_EN: &str = "System is busy, please try again in {wait}";
const MULTIPLE_BUCKETS_CN: &str = "系统繁忙，请{wait}后再试";

/// `(value, unit)` for a duration in seconds, coarsened to the unit a human
/// would use: seconds below a minute, minutes below an hour, hours below a
/// day, else days.
fn coarsen(seconds: i64) -> (i64, &'static str, &'static str) {
    if seconds < 60 {
        (seconds, if seconds == 1 { "second" } else { "seconds" }, "秒")
    } else if seconds < 3600 {
        let v = seconds / 60;
        (v, if v == 1 { "minute" } else { "minutes" }, "分钟")
    } else if seconds < 86_400 {
        let v = seconds / 3600;
        (v, if v == 1 { "hour" } else { "hours" }, "小时")
    } else {
        let v = seconds / 86_400;
        (v, if v == 1 { "day" } else { "days" }, "天")
    }
}

fn wait_text_en(seconds: i64) -> String {
    let (value, unit, _) = coarsen(seconds);
    format!("{value} {unit}")
}

fn wait_text_cn(seconds: i64) -> String {
    let (value, _, unit) = coarsen(seconds);
    format!("{value}{unit}")
}

fn fmt_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{}", rate as i64)
    } else {
        format!("{rate}")
    }
}

/// Denial text for the token bucket and leaky bucket "rate" family, sharing
/// one template shape keyed on the bucket kind.
pub(crate) fn token_bucket(rate: f64, wait_seconds: i64) -> (String, String) {
    let wait_en = wait_text_en(wait_seconds);
    let wait_cn = wait_text_cn(wait_seconds);
    let rate = fmt_rate(rate);
    (
        TOKEN_BUCKET_EN
            .replace("{rate}", &rate)
            .replace("{wait}", &wait_en),
        TOKEN_BUCKET_CN
            .replace("{rate}", &rate)
            .replace("{wait}", &wait_cn),
    )
}

pub(crate) fn leaky_bucket(rate: f64, wait_seconds: i64) -> (String, String) {
    let wait_en = wait_text_en(wait_seconds);
    let wait_cn = wait_text_cn(wait_seconds);
    let rate = fmt_rate(rate);
    (
        LEAKY_BUCKET_EN
            .replace("{rate}", &rate)
            .replace("{wait}", &wait_en),
        LEAKY_BUCKET_CN
            .replace("{rate}", &rate)
            .replace("{wait}", &wait_cn),
    )
}

/// Denial text shared by fixed-window and sliding-window algorithms.
pub(crate) fn window(
    max_requests: u64,
    window_size: i64,
    count: u64,
    wait_seconds: i64,
) -> (String, String) {
    let wait_en = wait_text_en(wait_seconds);
    let wait_cn = wait_text_cn(wait_seconds);
    let time_en = wait_text_en(window_size);
    let time_cn = wait_text_cn(window_size);
    (
        WINDOW_EN
            .replace("{max_requests}", &max_requests.to_string())
            .replace("{time}", &time_en)
            .replace("{count}", &count.to_string())
            .replace("{wait}", &wait_en),
        WINDOW_CN
            .replace("{max_requests}", &max_requests.to_string())
            .replace("{time}", &time_cn)
            .replace("{count}", &count.to_string())
            .replace("{wait}", &wait_cn),
    )
}

pub(crate) fn multiple_buckets(wait_seconds: i64) -> (String, String) {
    let wait_en = wait_text_en(wait_seconds);
    let wait_cn = wait_text_cn(wait_seconds);
    (
        MULTIPLE_BUCKETS_EN.replace("{wait}", &wait_en),
        MULTIPLE_BUCKETS_CN.replace("{wait}", &wait_cn),
    )
}
