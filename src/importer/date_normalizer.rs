// ==========================================
// 生产排程甘特图 - 日期时间归一化
// ==========================================
// 职责: 多种日期时间表示 → 唯一时间点
// 策略（依次尝试，首个成功即返回）:
//   1. 显式格式列表（日在前: 点/横线/斜线；年在前: 横线/斜线；4 位年先于 2 位年）
//   2. 表格日期序列号（>= 60 减一天，纪元 1899-12-30，年份须在 (1900, 2100)）
//   3. 毫秒 Unix 时间戳（须晚于 2000 年）
//   4. ISO-8601
// 失败返回 None（绝不当作纪元零点）
// 已知简化: 2 位年份一律 +2000，不做世纪窗口判断
// ==========================================

use crate::domain::Timestamp;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// 2000-01-01T00:00:00Z 的毫秒时间戳
const MIN_UNIX_MILLIS: i64 = 946_684_800_000;

// ==========================================
// DatePattern - 显式日期格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    DayFirst,
    YearFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearDigits {
    Four,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePart {
    None,
    HourMinute,
    HourMinuteSecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePattern {
    pub name: &'static str,
    pub order: FieldOrder,
    pub separator: char,
    pub year: YearDigits,
    pub time: TimePart,
}

const fn pattern(
    name: &'static str,
    order: FieldOrder,
    separator: char,
    year: YearDigits,
    time: TimePart,
) -> DatePattern {
    DatePattern {
        name,
        order,
        separator,
        year,
        time,
    }
}

use FieldOrder::{DayFirst, YearFirst};
use TimePart::{HourMinute, HourMinuteSecond};
use YearDigits::{Four, Two};

/// 显式格式列表（顺序即优先级）
pub const DATE_PATTERNS: [DatePattern; 24] = [
    // 点
    pattern("dd.MM.yyyy HH:mm:ss", DayFirst, '.', Four, HourMinuteSecond),
    pattern("dd.MM.yyyy HH:mm", DayFirst, '.', Four, HourMinute),
    pattern("dd.MM.yyyy", DayFirst, '.', Four, TimePart::None),
    // 横线
    pattern("dd-MM-yyyy HH:mm:ss", DayFirst, '-', Four, HourMinuteSecond),
    pattern("dd-MM-yyyy HH:mm", DayFirst, '-', Four, HourMinute),
    pattern("dd-MM-yyyy", DayFirst, '-', Four, TimePart::None),
    pattern("yyyy-MM-dd HH:mm:ss", YearFirst, '-', Four, HourMinuteSecond),
    pattern("yyyy-MM-dd HH:mm", YearFirst, '-', Four, HourMinute),
    pattern("yyyy-MM-dd", YearFirst, '-', Four, TimePart::None),
    // 斜线
    pattern("dd/MM/yyyy HH:mm:ss", DayFirst, '/', Four, HourMinuteSecond),
    pattern("dd/MM/yyyy HH:mm", DayFirst, '/', Four, HourMinute),
    pattern("dd/MM/yyyy", DayFirst, '/', Four, TimePart::None),
    pattern("yyyy/MM/dd HH:mm:ss", YearFirst, '/', Four, HourMinuteSecond),
    pattern("yyyy/MM/dd HH:mm", YearFirst, '/', Four, HourMinute),
    pattern("yyyy/MM/dd", YearFirst, '/', Four, TimePart::None),
    // 2 位年份
    pattern("dd.MM.yy HH:mm:ss", DayFirst, '.', Two, HourMinuteSecond),
    pattern("dd.MM.yy HH:mm", DayFirst, '.', Two, HourMinute),
    pattern("dd.MM.yy", DayFirst, '.', Two, TimePart::None),
    pattern("dd-MM-yy HH:mm:ss", DayFirst, '-', Two, HourMinuteSecond),
    pattern("dd-MM-yy HH:mm", DayFirst, '-', Two, HourMinute),
    pattern("dd-MM-yy", DayFirst, '-', Two, TimePart::None),
    pattern("dd/MM/yy HH:mm:ss", DayFirst, '/', Two, HourMinuteSecond),
    pattern("dd/MM/yy HH:mm", DayFirst, '/', Two, HourMinute),
    pattern("dd/MM/yy", DayFirst, '/', Two, TimePart::None),
];

impl DatePattern {
    fn regex_source(&self) -> String {
        let sep = regex::escape(&self.separator.to_string());
        let year = match self.year {
            Four => r"(\d{4})",
            Two => r"(\d{2})",
        };
        let date = match self.order {
            DayFirst => format!(r"(\d{{1,2}}){sep}(\d{{1,2}}){sep}{year}"),
            YearFirst => format!(r"{year}{sep}(\d{{1,2}}){sep}(\d{{1,2}})"),
        };
        let time = match self.time {
            TimePart::None => "",
            HourMinute => r" (\d{1,2}):(\d{2})",
            HourMinuteSecond => r" (\d{1,2}):(\d{2}):(\d{2})",
        };
        format!("^{date}{time}$")
    }

    /// 尝试按本格式解析（日期/时间分量非法时返回 None）
    fn try_parse(&self, re: &Regex, input: &str) -> Option<Timestamp> {
        let caps = re.captures(input)?;
        let num = |i: usize| -> Option<u32> { caps.get(i)?.as_str().parse().ok() };

        let (day, month, year) = match self.order {
            DayFirst => (num(1)?, num(2)?, num(3)?),
            YearFirst => (num(3)?, num(2)?, num(1)?),
        };
        let year = normalize_year(year as i32);
        let date = NaiveDate::from_ymd_opt(year, month, day)?;

        let time = match self.time {
            TimePart::None => NaiveTime::MIN,
            HourMinute => NaiveTime::from_hms_opt(num(4)?, num(5)?, 0)?,
            HourMinuteSecond => NaiveTime::from_hms_opt(num(4)?, num(5)?, num(6)?)?,
        };
        Some(date.and_time(time))
    }

    /// 按本格式输出（用于回环测试与报表）
    pub fn format(&self, ts: &Timestamp) -> String {
        let sep = self.separator;
        let year = match self.year {
            Four => format!("{:04}", ts.year()),
            Two => format!("{:02}", ts.year().rem_euclid(100)),
        };
        let date = match self.order {
            DayFirst => format!("{:02}{sep}{:02}{sep}{year}", ts.day(), ts.month()),
            YearFirst => format!("{year}{sep}{:02}{sep}{:02}", ts.month(), ts.day()),
        };
        match self.time {
            TimePart::None => date,
            HourMinute => format!("{date} {}", ts.format("%H:%M")),
            HourMinuteSecond => format!("{date} {}", ts.format("%H:%M:%S")),
        }
    }
}

/// 0..=99 的年份按 2000+YY 处理
fn normalize_year(year: i32) -> i32 {
    if (0..100).contains(&year) {
        2000 + year
    } else {
        year
    }
}

fn pattern_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| {
        DATE_PATTERNS
            .iter()
            .map(|p| Regex::new(&p.regex_source()).expect("date pattern regex"))
            .collect()
    })
}

fn date_time_separator_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r"^(\d{1,4}[./-]\d{1,2}[./-]\d{1,4})\s*[,.]\s*(\d{1,2}:\d{2})")
            .expect("date-time separator regex")
    })
}

fn whitespace_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn time_of_day_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?").expect("time of day regex")
    })
}

fn looks_like_date_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"[./-]|\d{4}").expect("date marker regex"))
}

// ==========================================
// DateNormalizer - 日期时间归一化器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct DateNormalizer;

impl DateNormalizer {
    /// 解析任意日期时间字符串
    ///
    /// # 返回
    /// - Some(Timestamp): 解析成功
    /// - None: 所有策略均失败（调用方应视为 "无法解析"）
    pub fn parse(&self, raw: &str) -> Option<Timestamp> {
        let normalized = normalize_input(raw)?;

        for (pattern, re) in DATE_PATTERNS.iter().zip(pattern_regexes()) {
            if let Some(ts) = pattern.try_parse(re, &normalized) {
                return Some(ts);
            }
        }

        parse_spreadsheet_serial(&normalized)
            .or_else(|| parse_unix_millis(&normalized))
            .or_else(|| parse_iso(&normalized))
    }

    /// 合并日期列与时间列
    pub fn combine(&self, date_part: &str, time_part: &str) -> Option<Timestamp> {
        let base = self.parse(date_part)?;
        Some(self.combine_on(base, time_part))
    }

    /// 在已解析的日期上应用时间列
    ///
    /// - 时间列为空 → 当日零点
    /// - 时间列本身是完整日期时间（含日期分隔符或 4 位年份）→ 直接采用，覆盖日期列
    /// - 否则提取 H:MM[:SS]；提取失败 → 当日零点
    pub fn combine_on(&self, base: Timestamp, time_part: &str) -> Timestamp {
        let midnight = base.date().and_time(NaiveTime::MIN);
        let trimmed = time_part.trim();
        if trimmed.is_empty() {
            return midnight;
        }

        if looks_like_date_regex().is_match(trimmed) {
            if let Some(full) = self.parse(trimmed) {
                return full;
            }
        }

        time_of_day_regex()
            .captures(trimmed)
            .and_then(|caps| {
                let h: u32 = caps.get(1)?.as_str().parse().ok()?;
                let m: u32 = caps.get(2)?.as_str().parse().ok()?;
                let s: u32 = caps
                    .get(3)
                    .map(|c| c.as_str().parse().unwrap_or(0))
                    .unwrap_or(0);
                NaiveTime::from_hms_opt(h, m, s)
            })
            .map(|t| base.date().and_time(t))
            .unwrap_or(midnight)
    }

    /// 面向操作员的显示格式
    pub fn format_display(&self, ts: &Timestamp) -> String {
        ts.format("%d.%m.%Y %H:%M:%S").to_string()
    }
}

/// 输入预处理：去空白；日期与时间之间的逗号/多余句点改为空格；压缩连续空白
fn normalize_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let separated = date_time_separator_regex().replace(trimmed, "$1 $2");
    Some(whitespace_regex().replace_all(&separated, " ").into_owned())
}

/// 表格日期序列号
fn parse_spreadsheet_serial(input: &str) -> Option<Timestamp> {
    let serial: f64 = input.parse().ok()?;
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    // 兼容表格软件把 1900 年当作闰年的历史缺陷
    let days = if serial >= 60.0 { serial - 1.0 } else { serial };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let millis = (days * 86_400_000.0).round();
    if millis > i64::MAX as f64 {
        return None;
    }
    let result = epoch.checked_add_signed(Duration::milliseconds(millis as i64))?;
    if result.year() > 1900 && result.year() < 2100 {
        Some(result)
    } else {
        None
    }
}

/// 毫秒 Unix 时间戳（仅接受 2000 年之后）
fn parse_unix_millis(input: &str) -> Option<Timestamp> {
    let millis: i64 = input.parse().ok()?;
    if millis <= MIN_UNIX_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// ISO-8601（带偏移的换算为 UTC）
fn parse_iso(input: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_day_first_with_dots() {
        let n = DateNormalizer;
        assert_eq!(n.parse("10.01.2025 06:28:00"), Some(ts(2025, 1, 10, 6, 28, 0)));
        assert_eq!(n.parse("1.2.2025 6:05"), Some(ts(2025, 2, 1, 6, 5, 0)));
        assert_eq!(n.parse("10.01.2025"), Some(ts(2025, 1, 10, 0, 0, 0)));
    }

    #[test]
    fn test_comma_and_stray_period_between_date_and_time() {
        let n = DateNormalizer;
        let expected = Some(ts(2025, 1, 10, 6, 28, 0));
        assert_eq!(n.parse("10.01.25, 06:28:00"), expected);
        assert_eq!(n.parse("10.01.25. 06:28:00"), expected);
        assert_eq!(n.parse("  10.01.25 ,  06:28:00 "), expected);
    }

    #[test]
    fn test_two_digit_year_adds_2000() {
        let n = DateNormalizer;
        assert_eq!(n.parse("31/12/99"), Some(ts(2099, 12, 31, 0, 0, 0)));
        assert_eq!(n.parse("05-06-07 08:09"), Some(ts(2007, 6, 5, 8, 9, 0)));
    }

    #[test]
    fn test_year_first_formats() {
        let n = DateNormalizer;
        assert_eq!(n.parse("2025-03-07 14:05:09"), Some(ts(2025, 3, 7, 14, 5, 9)));
        assert_eq!(n.parse("2025/03/07 14:05"), Some(ts(2025, 3, 7, 14, 5, 0)));
    }

    #[test]
    fn test_year_first_with_comma_or_period_before_time() {
        let n = DateNormalizer;
        let expected = Some(ts(2025, 1, 10, 6, 28, 0));
        assert_eq!(n.parse("2025-01-10, 06:28"), expected);
        assert_eq!(n.parse("2025/01/10. 06:28"), expected);
    }

    #[test]
    fn test_invalid_calendar_date_is_rejected() {
        let n = DateNormalizer;
        assert_eq!(n.parse("31.02.2025"), None);
        assert_eq!(n.parse("10.01.2025 25:00"), None);
    }

    #[test]
    fn test_spreadsheet_serial() {
        let n = DateNormalizer;
        // >= 60 时减去一天
        assert_eq!(n.parse("45667"), Some(ts(2025, 1, 9, 0, 0, 0)));
        assert_eq!(n.parse("45667.5"), Some(ts(2025, 1, 9, 12, 0, 0)));
        // 1900 年及更早被拒绝
        assert_eq!(n.parse("10"), None);
    }

    #[test]
    fn test_unix_millis_after_2000_only() {
        let n = DateNormalizer;
        assert_eq!(n.parse("1736490480000"), Some(ts(2025, 1, 10, 6, 28, 0)));
        assert_eq!(n.parse("946684800000"), None);
    }

    #[test]
    fn test_iso_fallback_converts_offset_to_utc() {
        let n = DateNormalizer;
        assert_eq!(
            n.parse("2025-01-10T06:28:00+01:00"),
            Some(ts(2025, 1, 10, 5, 28, 0))
        );
        assert_eq!(n.parse("2025-01-10T06:28:00"), Some(ts(2025, 1, 10, 6, 28, 0)));
    }

    #[test]
    fn test_unparseable_returns_none() {
        let n = DateNormalizer;
        assert_eq!(n.parse(""), None);
        assert_eq!(n.parse("   "), None);
        assert_eq!(n.parse("jutro rano"), None);
        assert_eq!(n.parse("-5"), None);
    }

    #[test]
    fn test_round_trip_every_pattern() {
        let n = DateNormalizer;
        let instant = ts(2025, 3, 7, 14, 5, 9);
        for p in DATE_PATTERNS.iter() {
            let text = p.format(&instant);
            let expected = match p.time {
                TimePart::None => ts(2025, 3, 7, 0, 0, 0),
                TimePart::HourMinute => ts(2025, 3, 7, 14, 5, 0),
                TimePart::HourMinuteSecond => instant,
            };
            assert_eq!(n.parse(&text), Some(expected), "pattern {} ({})", p.name, text);
        }
    }

    #[test]
    fn test_combine_time_of_day() {
        let n = DateNormalizer;
        assert_eq!(
            n.combine("10.01.2025", "06:45"),
            Some(ts(2025, 1, 10, 6, 45, 0))
        );
        assert_eq!(
            n.combine("10.01.2025", "6:45:30"),
            Some(ts(2025, 1, 10, 6, 45, 30))
        );
        assert_eq!(n.combine("10.01.2025", ""), Some(ts(2025, 1, 10, 0, 0, 0)));
        assert_eq!(n.combine("10.01.2025", "rano"), Some(ts(2025, 1, 10, 0, 0, 0)));
        assert_eq!(n.combine("nonsense", "06:45"), None);
    }

    #[test]
    fn test_combine_full_datetime_in_time_column_wins() {
        let n = DateNormalizer;
        assert_eq!(
            n.combine("10.01.2025", "09.10.2025 06:45"),
            Some(ts(2025, 10, 9, 6, 45, 0))
        );
    }
}
