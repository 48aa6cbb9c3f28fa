//! CLI command implementations

use anyhow::Context;
use marquee_core::{
    plugins::{DashPlugin, HlsPlugin, ProgressivePlugin},
    selector::select_metadata,
    CanPlay, Capabilities, DescriptorFetcher, HttpFetcher, MediaItem, NativeSupport,
    PlayerConfig, Preferences, SourceCatalog,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::output::{self, ProbeReport, RepresentationRow};

/// Native support of a headless environment: the containers every
/// mainstream browser decodes without extensions
struct HeadlessSupport;

impl NativeSupport for HeadlessSupport {
    fn can_play_type(&self, mime_type: &str) -> CanPlay {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "video/mp4" | "audio/mp4" | "audio/mpeg" | "audio/aac" => CanPlay::Probably,
            "video/webm" | "audio/webm" | "audio/ogg" | "video/ogg" | "audio/wav" => CanPlay::Maybe,
            _ => CanPlay::No,
        }
    }
}

/// Arguments of the `select` command
pub struct SelectRequest {
    pub item: usize,
    pub quality: Option<u32>,
    pub language: Option<String>,
    pub viewport_height: f64,
    pub dpr: f64,
}

/// Load the player configuration, falling back to defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    let config = match path {
        Some(path) => PlayerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn capabilities() -> anyhow::Result<Capabilities> {
    let native: Arc<dyn NativeSupport> = Arc::new(HeadlessSupport);
    Ok(Capabilities::new(Arc::clone(&native))
        .with_plugin(Arc::new(HlsPlugin::new()?))
        .with_plugin(Arc::new(DashPlugin::new()?))
        .with_plugin(Arc::new(ProgressivePlugin::new(native))))
}

fn catalog(config: &PlayerConfig) -> anyhow::Result<SourceCatalog> {
    let fetcher: Arc<dyn DescriptorFetcher> = Arc::new(HttpFetcher::new()?);
    Ok(SourceCatalog::new(config.catalog_options(), Arc::new(capabilities()?)).with_fetcher(fetcher))
}

/// Turn a command-line argument into descriptor input. URLs and plain
/// sources stay strings, files and inline documents are decoded.
fn descriptor_input(arg: &str) -> anyhow::Result<Value> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Ok(Value::String(arg.to_string()));
    }

    let path = Path::new(arg);
    if path.is_file() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()));
    }

    match serde_json::from_str(arg) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(arg.to_string())),
    }
}

async fn parse(config: &PlayerConfig, descriptor: &str) -> anyhow::Result<Vec<MediaItem>> {
    let input = descriptor_input(descriptor)?;
    let items = catalog(config)?
        .parse(input)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.error_code()))?;
    info!(items = items.len(), "Descriptor parsed");
    Ok(items)
}

/// Parse a descriptor and list everything it contains
pub async fn inspect(config: &PlayerConfig, descriptor: &str, format: &str) -> anyhow::Result<()> {
    let items = parse(config, descriptor).await?;
    let language = config.preferred_language.as_deref();

    match output::OutputFormat::from(format) {
        output::OutputFormat::Json => {
            println!("{}", output::format_output(&items, format));
        }
        output::OutputFormat::Table => {
            let rows: Vec<RepresentationRow> = items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| item.representations().map(move |rep| RepresentationRow::new(i, rep)))
                .collect();
            println!("{}", output::table(rows));
        }
        output::OutputFormat::Text => {
            println!("Items: {}", items.len());
            for (i, item) in items.iter().enumerate() {
                let title = item
                    .title
                    .as_ref()
                    .and_then(|t| t.resolve(language))
                    .unwrap_or("(untitled)");
                println!("\n{}. {}", i + 1, title);
                println!("  Languages: {}", item.languages().join(", "));
                for variant in &item.variants {
                    println!(
                        "  Variant [{}]{}",
                        variant.language.as_deref().unwrap_or("-"),
                        if variant.default { " (default)" } else { "" }
                    );
                    for rep in &variant.representations {
                        println!("    {}", output::describe(rep));
                    }
                }
                if !item.tracks.is_empty() {
                    println!("  Text tracks: {}", item.tracks.len());
                }
                if !item.chapters.is_empty() {
                    println!("  Chapters: {}", item.chapters.len());
                }
            }
        }
    }

    Ok(())
}

/// Run the selector the way a player would for the given viewport
pub async fn select(
    config: &PlayerConfig,
    descriptor: &str,
    request: SelectRequest,
    format: &str,
) -> anyhow::Result<()> {
    let items = parse(config, descriptor).await?;
    let item = items
        .get(request.item)
        .with_context(|| format!("Item {} out of range ({} items)", request.item, items.len()))?;

    let prefs = Preferences::new(
        request.quality.or(config.preferred_quality),
        request.language.or_else(|| config.preferred_language.clone()),
    );
    debug!(?prefs, viewport_height = request.viewport_height, dpr = request.dpr, "Selecting");

    let meta = select_metadata(item, &prefs, request.viewport_height, request.dpr)
        .context("Item has no representations")?;

    match output::OutputFormat::from(format) {
        output::OutputFormat::Json => println!("{}", output::format_output(&meta, format)),
        output::OutputFormat::Table | output::OutputFormat::Text => {
            println!("Selected: {}", meta.src);
            println!("  Type: {}", meta.mime_type.as_deref().unwrap_or("unknown"));
            println!("  Language: {}", meta.language.as_deref().unwrap_or("-"));
            println!(
                "  Quality: {}",
                meta.quality.map(|q| format!("{}p", q)).unwrap_or_else(|| "-".to_string())
            );
        }
    }

    Ok(())
}

/// HEAD a source and report whether it is reachable
pub async fn probe(url: &str, format: &str) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new()?;
    let report = match fetcher.head_status(url).await {
        Ok(status) => ProbeReport {
            url: url.to_string(),
            status: Some(status),
            reachable: status < 400,
            error: None,
        },
        Err(e) => ProbeReport {
            url: url.to_string(),
            status: None,
            reachable: false,
            error: Some(e.to_string()),
        },
    };

    match output::OutputFormat::from(format) {
        output::OutputFormat::Json => println!("{}", output::format_output(&report, format)),
        output::OutputFormat::Table => println!("{}", output::table(vec![report.clone()])),
        output::OutputFormat::Text => {
            let status = report
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| report.error.clone().unwrap_or_default());
            println!(
                "{} {} ({})",
                if report.reachable { "REACHABLE" } else { "UNREACHABLE" },
                report.url,
                status
            );
        }
    }

    if !report.reachable {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_input_shapes() {
        assert_eq!(
            descriptor_input("https://example.com/d.json").unwrap(),
            Value::String("https://example.com/d.json".into())
        );
        assert_eq!(
            descriptor_input(r#"{"src": "a.mp4"}"#).unwrap(),
            serde_json::json!({"src": "a.mp4"})
        );
        assert_eq!(descriptor_input("movie.mp4").unwrap(), Value::String("movie.mp4".into()));
    }

    #[test]
    fn test_headless_support_ignores_codecs() {
        assert_eq!(
            HeadlessSupport.can_play_type("video/mp4; codecs=\"avc1.42E01E\""),
            CanPlay::Probably
        );
        assert_eq!(HeadlessSupport.can_play_type("video/webm"), CanPlay::Maybe);
        assert_eq!(HeadlessSupport.can_play_type("application/x-mpegurl"), CanPlay::No);
    }

    #[tokio::test]
    async fn test_inline_descriptor_parses() {
        let items = parse(&PlayerConfig::default(), "movie.mp4").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].representations().count(), 1);
    }
}
