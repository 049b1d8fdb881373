//! # pagequote-app
//!
//! PageQuote CLI 바이너리 진입점.
//! 설정 로드, 로깅 초기화, OCR/크롭/저장소 어댑터 와이어링 후 배치 한 번을 실행한다.

mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pagequote_core::config::{AppConfig, Granularity, OverlapPolicy};
use pagequote_core::config_manager::ConfigManager;
use pagequote_network::ai_ocr_client::RemoteOcrProvider;
use pagequote_session::{BatchImage, CaptureSession};
use pagequote_vision::crop::ImageCrateCropper;

use crate::sink::JsonFileQuoteSink;

/// 책 페이지 사진에서 인용 후보 문장을 뽑는다
#[derive(Parser, Debug)]
#[command(name = "pagequote")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 페이지 이미지 파일 (png, jpeg, webp)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 밑줄과 겹치는 문단 처리 방식
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// 본문 후보 단위
    #[arg(long, value_enum)]
    granularity: Option<GranularityArg>,

    /// 동시에 처리할 이미지 수
    #[arg(long)]
    concurrency: Option<usize>,

    /// 이번 실행의 설정 덮어쓰기를 설정 파일에도 저장
    #[arg(long)]
    save_config: bool,

    /// 선택된 인용을 덧붙일 JSON 파일
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// 겹친 부분을 지우고 남은 부분이 충분히 길면 유지
    Strip,
    /// 겹치는 문단 전체 제외
    Skip,
}

impl From<PolicyArg> for OverlapPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strip => OverlapPolicy::StripRemainder,
            PolicyArg::Skip => OverlapPolicy::SkipParagraph,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GranularityArg {
    Paragraph,
    Sentence,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Paragraph => Granularity::Paragraph,
            GranularityArg::Sentence => Granularity::Sentence,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "pagequote={},pagequote_app={},pagequote_core={},pagequote_text={},pagequote_vision={},pagequote_network={},pagequote_session={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let (config_manager, config) = load_config(&args)?;
    let endpoint = config.ocr_api.as_ref().ok_or_else(|| {
        anyhow!(
            "OCR API 미설정: {} 파일에 ocr_api 항목을 추가하세요",
            config_manager.config_path().display()
        )
    })?;
    let ocr = Arc::new(RemoteOcrProvider::new(endpoint)?);
    let mut session = CaptureSession::new(&config, ocr, Arc::new(ImageCrateCropper::new()));

    for path in &args.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("이미지 읽기 실패: {}", path.display()))?;
        session.add_image(BatchImage::new(
            path.display().to_string(),
            bytes,
            image_format(path),
        ))?;
    }

    let report = session
        .process_batch(|p| eprintln!("[{}/{}] {}", p.completed, p.total, p.image_id))
        .await;
    if let Some(notice) = report.failure_notice() {
        eprintln!("{notice}");
        for failure in report.failures() {
            warn!(image_id = %failure.image_id, status = ?failure.status, "인식 실패");
        }
    }

    print_candidates(&session);

    match &args.output {
        Some(path) => {
            let sink = JsonFileQuoteSink::new(path);
            let saved = session.save(&sink).await?;
            println!("\n{}개 인용을 {}에 저장했습니다", saved, sink.path().display());
        }
        None => info!("--output 미지정, 저장 생략"),
    }

    Ok(())
}

/// 설정 파일 로드 → CLI 덮어쓰기 (`--save-config`이면 파일에도 반영)
fn load_config(args: &Args) -> Result<(ConfigManager, AppConfig)> {
    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", config_manager.config_path().display());

    let config = apply_overrides(config_manager.get(), args)?;
    if args.save_config {
        config_manager.update(config.clone())?;
        info!("CLI 덮어쓰기를 설정 파일에 저장");
    }
    Ok((config_manager, config))
}

/// CLI 플래그로 이번 실행의 설정 덮어쓰기 (파일은 그대로)
fn apply_overrides(mut config: AppConfig, args: &Args) -> Result<AppConfig> {
    if let Some(policy) = args.policy {
        config.extraction.overlap_policy = policy.into();
    }
    if let Some(granularity) = args.granularity {
        config.extraction.granularity = granularity.into();
    }
    if let Some(concurrency) = args.concurrency {
        config.batch.max_concurrency = concurrency;
    }
    config.validate()?;
    Ok(config)
}

fn image_format(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string())
}

fn print_candidates(session: &CaptureSession) {
    let groups = session.grouped();
    if groups.is_empty() {
        println!("추출된 후보가 없습니다");
        return;
    }

    for group in groups {
        match session.page_number(group.image_id) {
            Some(page) => println!("\n## {} (p. {})", group.image_id, page),
            None => println!("\n## {}", group.image_id),
        }
        for candidate in group.candidates {
            let mark = if candidate.selected { "x" } else { " " };
            let underline = if candidate.is_underlined() { "*" } else { " " };
            println!("[{}]{} {}", mark, underline, candidate.content);
        }
    }
    println!(
        "\n선택됨 {}/{}",
        session.candidates().selected_count(),
        session.candidates().len()
    );
}
