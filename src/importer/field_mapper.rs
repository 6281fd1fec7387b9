// ==========================================
// 生产排程甘特图 - 字段映射器实现
// ==========================================
// 职责: 表头行 → 逻辑字段映射建议 + 映射校验 + 表头指纹
// 匹配规则: 表头归一化后与别名双向子串包含；
//           每个逻辑字段取第一个命中的表头
// 说明: 别名重叠时同一表头可能被多个字段选中，此处不做消歧
// ==========================================

use crate::domain::{FieldMapping, LogicalField, MappingProfile, Transformation};
use crate::i18n;
use crate::importer::error::ImporterResult;
use crate::importer::importer_trait::ProfileStore;
use async_trait::async_trait;
use std::sync::OnceLock;
use tokio::sync::RwLock;

/// 逻辑字段别名表（源语言 + 英文），顺序即优先级
pub const FIELD_ALIASES: [(LogicalField, &[&str]); 13] = [
    (
        LogicalField::OrderNo,
        &[
            "order no",
            "order no.",
            "order_no",
            "orderno",
            "id",
            "order id",
            "zlecenie",
            "numer zlecenia",
            "nr zlecenia",
        ],
    ),
    (
        LogicalField::Resource,
        &[
            "resource",
            "machine",
            "workcenter",
            "workstation",
            "work station",
            "maszyna",
            "stanowisko",
            "gniazdo",
            "zasoby",
        ],
    ),
    (
        LogicalField::StartTime,
        &[
            "start",
            "start time",
            "start_time",
            "startdate",
            "start date",
            "from",
            "poczatek",
            "początek",
            "od",
            "data rozpoczecia",
        ],
    ),
    (
        LogicalField::EndTime,
        &[
            "end",
            "end time",
            "end_time",
            "enddate",
            "end date",
            "to",
            "koniec",
            "do",
            "data zakonczenia",
        ],
    ),
    (
        LogicalField::OpNo,
        &["op", "op no", "op. no.", "op_no", "operation", "operacja", "nr operacji"],
    ),
    (
        LogicalField::PartNo,
        &[
            "part",
            "partno",
            "part no",
            "part_no",
            "nr partii",
            "part number",
            "partia",
            "batch",
            "lot",
        ],
    ),
    (
        LogicalField::ProductName,
        &["product", "product name", "produkt", "nazwa produktu"],
    ),
    (
        LogicalField::Qty,
        &["qty", "quantity", "ilosc", "ilość", "count", "amount", "ile"],
    ),
    (
        LogicalField::OperationId,
        &["operation id", "op id", "operation_id", "op_id"],
    ),
    (
        LogicalField::Sequence,
        &["sequence", "seq", "kolejnosc", "kolejność", "porządek"],
    ),
    (
        LogicalField::Notes,
        &["notes", "note", "uwagi", "opis", "komentarz", "remarks"],
    ),
    (
        LogicalField::DateColumn,
        &["date", "data", "data operacji", "dzien"],
    ),
    (
        LogicalField::TimeColumn,
        &["time", "czas", "godzina", "godz"],
    ),
];

/// 别名表（已归一化）
fn normalized_aliases() -> &'static [(LogicalField, Vec<String>)] {
    static CELL: OnceLock<Vec<(LogicalField, Vec<String>)>> = OnceLock::new();
    CELL.get_or_init(|| {
        FIELD_ALIASES
            .iter()
            .map(|(field, aliases)| {
                let normalized = aliases
                    .iter()
                    .map(|a| normalize_header(a))
                    .filter(|a| !a.is_empty())
                    .collect();
                (*field, normalized)
            })
            .collect()
    })
}

/// 表头归一化：小写；波兰语字母折叠为 ASCII；非字母数字连续段 → 单个空格；TRIM
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_space = false;
    for ch in header.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            other => other,
        };
        if folded.is_ascii_lowercase() || folded.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(folded);
        } else {
            pending_space = true;
        }
    }
    out
}

/// 表头集合指纹（与列顺序无关）
///
/// 每个表头小写后仅保留 [a-z0-9]，排序后以 '|' 连接，
/// 再做 32 位 `h * 31 + c` 滚动哈希，以 36 进制输出（负数带 '-'）。
pub fn header_fingerprint(headers: &[String]) -> String {
    let mut keys: Vec<String> = headers
        .iter()
        .map(|h| {
            h.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect()
        })
        .collect();
    keys.sort();
    let joined = keys.join("|");

    let hash = joined
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32));
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = value < 0;
    let mut n = (value as i64).unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        buf.push(b'-');
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// 空映射（所有字段未绑定）
pub fn default_mapping() -> FieldMapping {
    FieldMapping::default()
}

/// 映射校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// 映射建议（来源: 已保存方案或自动检测）
#[derive(Debug, Clone)]
pub struct MappingSuggestion {
    pub mapping: FieldMapping,
    pub transformations: Vec<Transformation>,
    pub header_hash: String,
    /// 命中的已保存方案 id；None 表示自动检测
    pub profile_id: Option<String>,
}

// ==========================================
// FieldMapper - 字段映射器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    /// 根据表头检测映射
    ///
    /// 返回的映射保存原始表头文本；未命中的字段保持为空
    pub fn detect(&self, headers: &[String]) -> FieldMapping {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut mapping = FieldMapping::default();

        for (field, aliases) in normalized_aliases() {
            let hit = normalized.iter().position(|header| {
                // 空表头不参与匹配（空串会被任何别名 "包含"）
                !header.is_empty()
                    && aliases
                        .iter()
                        .any(|alias| header.contains(alias.as_str()) || alias.contains(header.as_str()))
            });
            if let Some(idx) = hit {
                mapping.set(*field, headers[idx].clone());
            }
        }

        tracing::debug!(
            headers = headers.len(),
            order_no = mapping.order_no.as_str(),
            resource = mapping.resource.as_str(),
            start = mapping.start_time.as_str(),
            end = mapping.end_time.as_str(),
            "字段映射检测完成"
        );
        mapping
    }

    /// 校验必填字段
    ///
    /// 必填: orderNo / resource / startTime / endTime；
    /// 配置了日期+时间拆分列时仅 startTime 可省略（开始时间由拆分列合成），endTime 始终必填
    pub fn validate(&self, mapping: &FieldMapping, locale: &str) -> MappingValidation {
        let mut errors = Vec::new();
        if mapping.get(LogicalField::OrderNo).is_none() {
            errors.push(i18n::t_in(locale, "mapping.order_required", &[]));
        }
        if mapping.get(LogicalField::Resource).is_none() {
            errors.push(i18n::t_in(locale, "mapping.resource_required", &[]));
        }
        if mapping.get(LogicalField::StartTime).is_none() && !mapping.uses_date_time_split() {
            errors.push(i18n::t_in(locale, "mapping.start_required", &[]));
        }
        if mapping.get(LogicalField::EndTime).is_none() {
            errors.push(i18n::t_in(locale, "mapping.end_required", &[]));
        }
        MappingValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// 给出映射建议：优先使用表头指纹匹配的已保存方案，否则自动检测
    pub async fn suggest(
        &self,
        headers: &[String],
        store: &dyn ProfileStore,
    ) -> ImporterResult<MappingSuggestion> {
        let header_hash = header_fingerprint(headers);

        if let Some(profile) = store.find_by_header_hash(&header_hash).await? {
            tracing::info!(
                profile = profile.name.as_str(),
                header_hash = header_hash.as_str(),
                "使用已保存的映射方案"
            );
            return Ok(MappingSuggestion {
                mapping: profile.mapping,
                transformations: profile.transformations,
                header_hash,
                profile_id: Some(profile.id),
            });
        }

        Ok(MappingSuggestion {
            mapping: self.detect(headers),
            transformations: Vec::new(),
            header_hash,
            profile_id: None,
        })
    }
}

// ==========================================
// InMemoryProfileStore - 内存方案存储
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<Vec<MappingProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_header_hash(
        &self,
        header_hash: &str,
    ) -> ImporterResult<Option<MappingProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .iter()
            .find(|p| p.header_hash.as_deref() == Some(header_hash))
            .cloned())
    }

    async fn default_profile(&self) -> ImporterResult<Option<MappingProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.is_default).cloned())
    }

    async fn list(&self) -> ImporterResult<Vec<MappingProfile>> {
        Ok(self.profiles.read().await.clone())
    }

    async fn save(&self, profile: MappingProfile) -> ImporterResult<()> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
        Ok(())
    }

    async fn set_default(&self, id: &str) -> ImporterResult<bool> {
        let mut profiles = self.profiles.write().await;
        if !profiles.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        for p in profiles.iter_mut() {
            p.is_default = p.id == id;
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> ImporterResult<bool> {
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        Ok(profiles.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Data Zakończenia "), "data zakonczenia");
        assert_eq!(normalize_header("Op. No."), "op no");
        assert_eq!(normalize_header("ILOŚĆ [szt]"), "ilosc szt");
        assert_eq!(normalize_header("___"), "");
    }

    #[test]
    fn test_detect_polish_headers() {
        let mapping = FieldMapper.detect(&headers(&["Zlecenie", "Maszyna", "Od", "Do"]));
        assert_eq!(mapping.order_no, "Zlecenie");
        assert_eq!(mapping.resource, "Maszyna");
        assert_eq!(mapping.start_time, "Od");
        assert_eq!(mapping.end_time, "Do");
    }

    #[test]
    fn test_detect_english_headers_keeps_raw_text() {
        let mapping = FieldMapper.detect(&headers(&[
            "Order No.",
            "Machine",
            "Start Time",
            "End Time",
            "Qty",
        ]));
        assert_eq!(mapping.order_no, "Order No.");
        assert_eq!(mapping.resource, "Machine");
        assert_eq!(mapping.start_time, "Start Time");
        assert_eq!(mapping.end_time, "End Time");
        assert_eq!(mapping.qty, "Qty");
    }

    #[test]
    fn test_detect_folds_accented_aliases() {
        let mapping = FieldMapper.detect(&headers(&["Ilość"]));
        assert_eq!(mapping.qty, "Ilość");
    }

    #[test]
    fn test_validate_reports_each_missing_field() {
        let result = FieldMapper.validate(&FieldMapping::default(), "en");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 4);
        assert_eq!(result.errors[0], "Field \"Order number\" is required");

        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::OrderNo, "Zlecenie");
        mapping.set(LogicalField::Resource, "Maszyna");
        mapping.set(LogicalField::StartTime, "Od");
        mapping.set(LogicalField::EndTime, "Do");
        assert!(FieldMapper.validate(&mapping, "en").is_valid);
    }

    #[test]
    fn test_validate_accepts_date_time_split() {
        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::OrderNo, "Zlecenie");
        mapping.set(LogicalField::Resource, "Maszyna");
        mapping.set(LogicalField::DateColumn, "Data");
        mapping.set(LogicalField::TimeColumn, "Godzina");
        mapping.set(LogicalField::EndTime, "Do");
        assert!(FieldMapper.validate(&mapping, "en").is_valid);
    }

    #[test]
    fn test_validate_date_time_split_still_requires_end() {
        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::OrderNo, "Zlecenie");
        mapping.set(LogicalField::Resource, "Maszyna");
        mapping.set(LogicalField::DateColumn, "Data");
        mapping.set(LogicalField::TimeColumn, "Godzina");

        let result = FieldMapper.validate(&mapping, "en");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0], "Field \"End time\" is required");
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = header_fingerprint(&headers(&["Zlecenie", "Maszyna", "Od"]));
        let b = header_fingerprint(&headers(&["od", "MASZYNA", "zlecenie"]));
        assert_eq!(a, b);
        assert_ne!(a, header_fingerprint(&headers(&["Zlecenie", "Maszyna"])));
    }

    #[test]
    fn test_fingerprint_value() {
        // "a" → 97 → "2p"
        assert_eq!(header_fingerprint(&headers(&["A"])), "2p");
        assert_eq!(header_fingerprint(&[]), "0");
        assert_eq!(to_base36(-37), "-11");
    }

    #[tokio::test]
    async fn test_suggest_prefers_saved_profile() {
        let store = InMemoryProfileStore::new();
        let cols = headers(&["Nr", "Gniazdo robocze", "Start", "Stop"]);

        let detected = FieldMapper.suggest(&cols, &store).await.unwrap();
        assert!(detected.profile_id.is_none());
        assert_eq!(detected.mapping.resource, "Gniazdo robocze");

        let mut confirmed = detected.mapping.clone();
        confirmed.set(LogicalField::OrderNo, "Nr");
        confirmed.set(LogicalField::EndTime, "Stop");
        let profile = MappingProfile::new("Hala A", confirmed.clone(), Some(detected.header_hash));
        let id = profile.id.clone();
        store.save(profile).await.unwrap();

        let suggested = FieldMapper.suggest(&cols, &store).await.unwrap();
        assert_eq!(suggested.profile_id.as_deref(), Some(id.as_str()));
        assert_eq!(suggested.mapping, confirmed);
    }

    #[tokio::test]
    async fn test_profile_store_default_and_delete() {
        let store = InMemoryProfileStore::new();
        let a = MappingProfile::new("A", default_mapping(), None);
        let b = MappingProfile::new("B", default_mapping(), None);
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.save(a).await.unwrap();
        store.save(b).await.unwrap();

        assert!(store.set_default(&b_id).await.unwrap());
        assert_eq!(store.default_profile().await.unwrap().unwrap().id, b_id);
        assert!(!store.set_default("missing").await.unwrap());

        assert!(store.delete(&a_id).await.unwrap());
        assert!(!store.delete(&a_id).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
