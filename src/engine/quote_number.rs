// ==========================================
// 挤压报价系统 - 报价号生成
// ==========================================
// 格式: Q-YYYYMMDD-HHMMSS-NNNN (NNNN ∈ [1000, 9999])
// 唯一性由数据库约束保证, 冲突时由调用方重新生成
// ==========================================

use chrono::NaiveDateTime;

/// 由时间戳与随机后缀组成报价号
pub fn format_quote_number(ts: NaiveDateTime, suffix: u16) -> String {
    format!("Q-{}-{:04}", ts.format("%Y%m%d-%H%M%S"), suffix)
}

/// 四位随机后缀
pub fn random_suffix() -> u16 {
    (uuid::Uuid::new_v4().as_u128() % 9000 + 1000) as u16
}

/// 以当前随机后缀生成报价号
pub fn generate_quote_number(ts: NaiveDateTime) -> String {
    format_quote_number(ts, random_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format() {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 22, 33)
            .unwrap();
        assert_eq!(format_quote_number(ts, 4821), "Q-20261019-142233-4821");
    }

    #[test]
    fn test_random_suffix_range() {
        for _ in 0..200 {
            let s = random_suffix();
            assert!((1000..=9999).contains(&s));
        }
    }
}
