mod cli;

use droplift::{
    config,
    events::{EventSink, PipelineEvent},
    pipeline::FilePipeline,
    upload::UploadService,
    watch::FileWatcher,
};
use droplift_custom::CustomUploaderItem;
use droplift_naming::{Counters, NameContext, NameTemplate, SystemClock};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::UrlReceived { url, .. } => println!("{}", url),
        PipelineEvent::UploadFailed { path, errors } => {
            eprintln!("Upload failed: {}", path.display());
            for error in errors {
                eprintln!("  {}", error);
            }
        }
        PipelineEvent::FilesDropped { .. } | PipelineEvent::UrlCollectionReceived { .. } => {}
    }
}

async fn watch(config_path: Option<&Path>) -> Result<()> {
    let config = Arc::new(config::load_config_or_default(config_path)?);

    let cancel = CancellationToken::new();
    let (events, mut event_rx) = EventSink::channel(config.events.channel_capacity);
    let uploader = UploadService::new(config.clone())
        .with_events(events)
        .with_cancellation(cancel.clone());
    let watcher = FileWatcher::new(FilePipeline::new(config.clone(), uploader));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutting down");
        shutdown.cancel();
    });

    tracing::info!("Starting droplift watcher");
    let result = watcher.run(cancel.clone()).await;
    cancel.cancel();
    printer.abort();
    result
}

async fn upload(paths: &[PathBuf], config_path: Option<&Path>) -> Result<()> {
    let config = Arc::new(config::load_config_or_default(config_path)?);
    let service = UploadService::new(config);
    tracing::info!(
        destination = %service.select_destination(),
        "Uploading {} file(s)",
        paths.len()
    );

    let results = service.upload_batch(paths).await;
    let mut failed = 0;
    for (path, result) in paths.iter().zip(&results) {
        if result.is_success() {
            println!("{}", result.url);
            continue;
        }
        failed += 1;
        eprintln!("✗ {} ({})", path.display(), result.error_title);
        for error in &result.errors {
            eprintln!("  {}", error);
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} uploads failed", failed, paths.len());
    }
    Ok(())
}

fn render_name(pattern: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pattern = pattern.unwrap_or_else(|| config.naming.pattern.clone());
    let template = NameTemplate::compile(&pattern);

    let mut ctx = NameContext::from_clock(&SystemClock, Arc::new(Counters::new()));
    if let Some(words) = config::load_word_list(&config) {
        ctx = ctx.with_word_list(words);
    }
    println!("{}", template.render(&mut ctx));
    Ok(())
}

fn migrate(file: &Path, write: bool) -> Result<()> {
    let item = CustomUploaderItem::load(file)
        .with_context(|| format!("Failed to load custom uploader: {:?}", file))?;

    if write {
        item.save(file)
            .with_context(|| format!("Failed to write custom uploader: {:?}", file))?;
        println!("✓ Migrated {} to version {}", file.display(), item.version);
    } else {
        println!("{}", item.to_json()?);
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, checking defaults");
            config::load_config_or_default(None)?
        }
    };

    let warnings = config::validate_config(&config)?;
    println!("✓ Configuration is valid");
    println!("  Watch enabled: {}", config.watch.enabled);
    if let Some(path) = &config.watch.path {
        println!("  Watch path: {}", path.display());
    }
    println!("  Naming pattern: {}", config.naming.pattern);
    println!("  Destination: {}", config.upload.destination);
    println!(
        "  Custom uploaders: {}",
        config.uploaders.custom_uploader_items.len()
    );
    println!("  Transcode enabled: {}", config.transcode.enabled);
    for warning in &warnings {
        println!("⚠ {}", warning);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "droplift=trace,droplift_custom=trace,droplift_naming=debug,droplift_common=debug"
                .to_string()
        } else {
            "droplift=debug,droplift_custom=debug,droplift_naming=debug".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Watch => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(watch(cli.config.as_deref()))
        }
        Commands::Upload { paths } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(upload(&paths, cli.config.as_deref()))
        }
        Commands::RenderName { pattern } => render_name(pattern, cli.config.as_deref()),
        Commands::Migrate { file, write } => migrate(&file, write),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("droplift {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
