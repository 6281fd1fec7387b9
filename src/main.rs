// ==========================================
// 生产排程甘特图 - 命令行入口
// ==========================================
// 用法: production-gantt <文件> [工作表] [表头行号]
// 流程: 读取配置 → 解析文件 → 自动映射 → 导入处理 → 泳道布局 → 自动适配视口
// 输出: 导入汇总、每个资源的泳道数、可视区域绘制列表统计
// ==========================================

use anyhow::{bail, Context, Result};
use production_gantt::config::ConfigManager;
use production_gantt::domain::{ViewFilters, ViewState};
use production_gantt::engine::{
    DrawListBuilder, ImportEvent, ImportEventBus, LayoutEngine, ScrollWindow,
};
use production_gantt::i18n;
use production_gantt::importer::{
    CancellationSource, FieldMapper, ImportError, ImportOptions, ImportProcessor,
    InMemoryProfileStore, ParseOptions, UniversalFileParser,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// 自动适配时假定的可用宽度
const FIT_WIDTH_PX: f64 = 1200.0;
const VIEWPORT_HEIGHT_PX: f64 = 800.0;

#[tokio::main]
async fn main() -> Result<()> {
    production_gantt::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        bail!("usage: production-gantt <file> [sheet] [header_row]");
    };
    let sheet_name = args.get(1).filter(|s| !s.is_empty()).cloned();
    let header_row = match args.get(2) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid header row: {}", raw))?,
        None => 1,
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", production_gantt::APP_NAME, production_gantt::VERSION);
    tracing::info!("==================================================");

    let config = ConfigManager::from_default_location()
        .context("failed to load configuration")?
        .snapshot()?;
    i18n::set_locale(&config.import.locale);

    if !Path::new(path).exists() {
        bail!(i18n::t_with_args("import.file_not_found", &[("path", path.as_str())]));
    }

    // 进度事件 → 日志
    let bus = ImportEventBus::default();
    let mut events = bus.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ImportEvent::Progress(p) => {
                    tracing::info!(stage = ?p.stage, progress = p.progress.round(), "导入进度")
                }
                ImportEvent::Completed(summary) => {
                    tracing::info!(parsed_ok = summary.parsed_ok, skipped = summary.skipped, "导入完成")
                }
                other => tracing::warn!(event = other.as_str(), "导入未完成"),
            }
        }
    });

    // Ctrl-C → 在下一个分块边界取消
    let cancel = Arc::new(CancellationSource::new());
    let interrupt = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("收到中断信号，取消导入");
                cancel.cancel();
            }
        })
    };
    let parser = UniversalFileParser::new(ParseOptions {
        sheet_name,
        header_row,
        chunk_size: config.import.chunk_size,
    });
    let parsed = match parser.parse(path, &bus, &cancel.token()).await {
        Ok(parsed) => parsed,
        Err(e) => return abort(&bus, e).with_context(|| format!("failed to parse {}", path)),
    };

    let suggestion = FieldMapper
        .suggest(&parsed.headers, &InMemoryProfileStore::new())
        .await?;
    let options = ImportOptions::new(suggestion.mapping)
        .with_transformations(suggestion.transformations);

    let processor = ImportProcessor::new(config.import.clone());
    let result = match processor
        .process_parsed(&parsed, &options, &bus, &cancel.token())
        .await
    {
        Ok(result) => result,
        Err(e) => return abort(&bus, e).context("import failed"),
    };
    interrupt.abort();
    bus.completed(&result);

    println!("file:            {}", path);
    println!("total rows:      {}", result.total);
    println!("parsed OK:       {}", result.parsed_ok);
    println!("missing fields:  {}", result.skipped_missing);
    println!("date errors:     {}", result.skipped_date_error);
    println!("end < start:     {}", result.skipped_end_before_start);
    println!("duplicates:      {}", result.duplicates_dropped);
    println!("other:           {}", result.skipped_other);
    println!("normalizations:  {}", result.diagnostics.date_normalizations);
    for issue in result.errors.iter().take(10) {
        println!("  {}", issue);
    }
    if result.errors.len() > 10 {
        println!("  ... {} more", result.errors.len() - 10);
    }

    let layout_engine = LayoutEngine::new(config.layout.clone());
    let layout = layout_engine.build(&result.operations, &ViewFilters::default());
    println!();
    println!("resources:       {}", layout.rows.len());
    for row in &layout.rows {
        println!("  {:<24} lanes={}", row.resource, row.lane_count());
    }

    let builder = DrawListBuilder::new(config.viewport.clone(), config.layout.clone());
    let all: Vec<_> = result.operations.iter().collect();
    if let Some(fit) = builder.viewport().auto_fit(&all, FIT_WIDTH_PX) {
        let view = ViewState::new(
            fit.start,
            fit.end,
            fit.pixels_per_hour,
            &builder.viewport().limits(),
        );
        let scroll = ScrollWindow {
            scroll_top: 0.0,
            scroll_left: 0.0,
            viewport_width: FIT_WIDTH_PX,
            viewport_height: VIEWPORT_HEIGHT_PX,
        };
        let draw = builder.build(&layout, &view, &scroll, &HashMap::new());
        println!();
        println!(
            "window:          {} .. {} @ {:.1} px/h",
            view.start_time, view.end_time, view.pixels_per_hour
        );
        println!(
            "visible:         {} of {} rows, {} bars, {} ticks",
            draw.rows.len(),
            draw.total_rows,
            draw.bar_count(),
            draw.ticks.len()
        );
    }

    println!();
    println!("{}", i18n::t("common.success"));

    drop(bus);
    let _ = listener.await;
    Ok(())
}

/// 广播失败/取消事件并返回原错误
fn abort<T>(bus: &ImportEventBus, err: ImportError) -> Result<T, ImportError> {
    if err.is_cancelled() {
        println!("{}", i18n::t("common.cancelled"));
        bus.cancelled();
    } else {
        bus.failed(err.to_string());
    }
    Err(err)
}
