use std::fmt;

use serde::{Serialize, Serializer};

use super::error::{Result, SceneError};

/// 定点数时间戳的精度：1 秒 = 10^9 tick
const TICKS_PER_SECOND: i64 = 1_000_000_000;
const MAX_FRACTION_DIGITS: usize = 9;

/// 一个场景中并行采集的三种数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Rgb,
    Depth,
    Intrinsics,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Rgb, Modality::Depth, Modality::Intrinsics];

    pub fn name(self) -> &'static str {
        match self {
            Modality::Rgb => "rgb",
            Modality::Depth => "depth",
            Modality::Intrinsics => "intrinsics",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 从文件名中提取出的时间戳
///
/// 能解析为十进制小数的时间戳会被规范化为定点数，所以 `1.50` 与 `1.5` 相等；
/// 其他格式作为不透明字符串保留，仅在完全相同时相等。
/// 十进制时间戳总是排在不透明时间戳之前，整体构成全序。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timestamp {
    Decimal(i64),
    Opaque(String),
}

impl Timestamp {
    pub fn parse(s: &str) -> Self {
        parse_decimal(s).map(Timestamp::Decimal).unwrap_or_else(|| Timestamp::Opaque(s.to_owned()))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp::Decimal((secs * TICKS_PER_SECOND as f64).round() as i64)
    }

    pub fn ticks(&self) -> Option<i64> {
        match self {
            Timestamp::Decimal(t) => Some(*t),
            Timestamp::Opaque(_) => None,
        }
    }

    /// 两个时间戳的距离（tick），不透明时间戳之间只有相等时才有定义
    pub fn distance(&self, other: &Timestamp) -> Option<u64> {
        match (self, other) {
            (Timestamp::Decimal(a), Timestamp::Decimal(b)) => Some(a.abs_diff(*b)),
            (a, b) if a == b => Some(0),
            _ => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Decimal(t) => {
                let sign = if *t < 0 { "-" } else { "" };
                let t = t.unsigned_abs();
                let secs = t / TICKS_PER_SECOND as u64;
                let frac = t % TICKS_PER_SECOND as u64;
                if frac == 0 {
                    write!(f, "{sign}{secs}")
                } else {
                    let frac = format!("{:09}", frac);
                    write!(f, "{sign}{secs}.{}", frac.trim_end_matches('0'))
                }
            }
            Timestamp::Opaque(s) => f.write_str(s),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 将秒数换算为 tick，用于匹配容差
pub fn secs_to_ticks(secs: f64) -> u64 {
    (secs.max(0.0) * TICKS_PER_SECOND as f64).round() as u64
}

pub fn ticks_to_secs(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

fn parse_decimal(s: &str) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if int.is_empty() || frac.len() > MAX_FRACTION_DIGITS {
        return None;
    }
    if !int.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.ends_with('.') {
        return None;
    }

    let int: i64 = int.parse().ok()?;
    let mut frac_ticks: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
    for _ in frac.len()..MAX_FRACTION_DIGITS {
        frac_ticks *= 10;
    }
    let ticks = int.checked_mul(TICKS_PER_SECOND)?.checked_add(frac_ticks)?;
    Some(if negative { -ticks } else { ticks })
}

/// 从单个文件名（不是路径）中提取时间戳
///
/// 文件名格式为 `<video_id>_<timestamp>.<ext>`，扩展名不区分大小写。
/// 不符合该格式的文件名返回 [`SceneError::MalformedFilename`]，由调用方决定如何处理。
pub fn extract(filename: &str, extension: &str) -> Result<Timestamp> {
    let malformed =
        |reason| SceneError::MalformedFilename { filename: filename.to_owned(), reason };

    if filename.starts_with('.') {
        return Err(malformed("隐藏文件"));
    }
    let Some((stem, ext)) = filename.rsplit_once('.') else {
        return Err(malformed("缺少扩展名"));
    };
    if !ext.eq_ignore_ascii_case(extension) {
        return Err(malformed("扩展名不匹配"));
    }
    let Some((_, timestamp)) = stem.rsplit_once('_') else {
        return Err(malformed("缺少时间戳分隔符 `_`"));
    };
    if timestamp.is_empty() {
        return Err(malformed("时间戳为空"));
    }
    Ok(Timestamp::parse(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_arkit_name() {
        let ts = extract("47333462_57352.271.png", "png").unwrap();
        assert_eq!(ts, Timestamp::Decimal(57352_271_000_000));
        assert_eq!(ts.to_string(), "57352.271");
    }

    #[test]
    fn test_extract_is_case_insensitive_on_extension() {
        let a = extract("1_10.5.PNG", "png").unwrap();
        let b = extract("1_10.5.png", "png").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_rejects_malformed() {
        for name in [".DS_Store", "noext", "47333462.png", "47333462_.png", "1_2.pincam"] {
            let err = extract(name, "png").unwrap_err();
            assert!(matches!(err, SceneError::MalformedFilename { .. }), "{name}");
        }
    }

    #[test]
    fn test_decimal_normalization() {
        assert_eq!(Timestamp::parse("1.50"), Timestamp::parse("1.5"));
        assert_eq!(Timestamp::parse("2"), Timestamp::parse("2.000"));
        assert_eq!(Timestamp::parse("-0.5").to_string(), "-0.5");
    }

    #[test]
    fn test_opaque_keys() {
        // 超过 9 位小数或包含非数字字符的时间戳不做数值解析
        assert!(matches!(Timestamp::parse("1.0000000001"), Timestamp::Opaque(_)));
        assert!(matches!(Timestamp::parse("frame7"), Timestamp::Opaque(_)));
        assert!(matches!(Timestamp::parse("3."), Timestamp::Opaque(_)));
        assert!(Timestamp::parse("999999") < Timestamp::parse("a"));
    }

    #[test]
    fn test_distance() {
        let a = Timestamp::parse("1.000");
        let b = Timestamp::parse("1.002");
        assert_eq!(a.distance(&b), Some(secs_to_ticks(0.002)));
        assert_eq!(a.distance(&Timestamp::parse("x")), None);
        assert_eq!(Timestamp::parse("x").distance(&Timestamp::parse("x")), Some(0));
    }

    #[test]
    fn test_numeric_order() {
        let parse_all = |v: &[&str]| v.iter().map(|s| Timestamp::parse(s)).collect::<Vec<_>>();
        let mut v = parse_all(&["10.0", "9.5", "100"]);
        v.sort();
        assert_eq!(v, parse_all(&["9.5", "10", "100"]));
    }
}
