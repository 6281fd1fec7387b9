// ==========================================
// 生产排程甘特图 - 列值转换
// ==========================================
// 职责: 单元格文本清洗（TRIM / 空值标准化）
//       + 调用方提供的正则替换（大小写不敏感）
//       + 标准替换: 逗号 → 点（编号、日期、数值字段；自由文本字段不做）
// ==========================================

use crate::domain::Transformation;
use crate::importer::error::{ImportError, ImporterResult};
use regex::{Regex, RegexBuilder};

/// 预编译的转换规则
#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    replacement: String,
}

/// 列值转换器（每次导入构建一次）
#[derive(Debug, Clone, Default)]
pub struct ValueTransformer {
    rules: Vec<CompiledRule>,
}

impl ValueTransformer {
    /// 编译转换规则
    ///
    /// # 错误
    /// - InvalidTransformation: pattern 不是合法正则
    pub fn new(transformations: &[Transformation]) -> ImporterResult<Self> {
        let rules = transformations
            .iter()
            .filter(|t| !t.pattern.is_empty())
            .map(|t| {
                RegexBuilder::new(&t.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledRule {
                        regex,
                        replacement: t.replacement.clone(),
                    })
                    .map_err(|e| ImportError::InvalidTransformation {
                        pattern: t.pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<ImporterResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn apply_rules(&self, value: &str) -> String {
        let mut current = value.trim().to_string();
        for rule in &self.rules {
            current = rule
                .regex
                .replace_all(&current, rule.replacement.as_str())
                .into_owned();
        }
        current
    }

    /// 规则 + 逗号 → 点 + TRIM
    pub fn apply(&self, value: &str) -> String {
        self.apply_rules(value).replace(',', ".").trim().to_string()
    }

    /// 转换编号/日期字段，空值 → None
    pub fn text(&self, value: &str) -> Option<String> {
        normalize_null(self.apply(value))
    }

    /// 转换自由文本字段（产品名、备注），保留逗号
    pub fn free_text(&self, value: &str) -> Option<String> {
        normalize_null(self.apply_rules(value))
    }

    /// 转换数值字段（逗号小数点 "12,5" → 12.5），非法 → None
    pub fn number(&self, value: &str) -> Option<f64> {
        let parsed = self.text(value)?.parse::<f64>().ok()?;
        parsed.is_finite().then_some(parsed)
    }

    /// 转换整数字段（允许 "3.0" 这类表格导出形式），非法 → None
    pub fn integer(&self, value: &str) -> Option<i64> {
        let text = self.text(value)?;
        if let Ok(n) = text.parse::<i64>() {
            return Some(n);
        }
        let f = text.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    }
}

/// 空白 → None
pub fn normalize_null(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
