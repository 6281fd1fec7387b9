// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和波兰文（源数据语言）
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "pl"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数，使用全局语言）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，使用全局语言）
///
/// # 示例
/// ```no_run
/// use production_gantt::i18n::t_with_args;
/// let msg = t_with_args("import.file_not_found", &[("path", "/tmp/plan.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key).to_string(), args)
}

/// 按指定语言翻译消息（带参数）
///
/// 导入流程按运行配置取语言，不依赖全局 locale，
/// 因此并发的导入任务之间互不影响。
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn interpolate(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
