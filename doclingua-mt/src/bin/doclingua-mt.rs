use clap::{Arg, Command};
use doclingua_mt::{
    MockMode, MockProvider, MtConfig, SourceLanguage, Strategy, TranslateOptions,
    TranslatorState, translate_upload,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("doclingua-mt")
        .version("0.1.0")
        .about("Translate a document while keeping its structure")
        .arg(
            Arg::new("file")
                .help("Document to translate (.docx, .pdf, .pptx, .png, .jpg)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("target-lang")
                .help("Target language, by name or code (e.g. Arabic, fr)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("source-lang")
                .long("source")
                .short('s')
                .help("Source language (default: auto-detect)")
                .default_value("auto"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .help("batch, batch-delimited or per-fragment (default: DOCLINGUA_STRATEGY or batch)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output path (default: translated_<name>.docx next to the input)"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock provider instead of Gemini")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show detailed translation process")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let input = matches.get_one::<String>("file").ok_or("missing file")?;
    let target = matches
        .get_one::<String>("target-lang")
        .ok_or("missing target language")?;
    let source = SourceLanguage::parse(matches.get_one::<String>("source-lang").map(String::as_str))?;

    let config = MtConfig::from_env()?;
    let strategy = match matches.get_one::<String>("strategy") {
        Some(value) => value.parse::<Strategy>()?,
        None => config.strategy,
    };

    let state = if matches.get_flag("mock") {
        TranslatorState::with_provider(
            Arc::new(MockProvider::new(MockMode::Suffix(format!(" [{}]", target)))),
            config.timeout,
        )
    } else {
        TranslatorState::from_config(&config)
    };
    let client = match state.client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set it with: export GEMINI_API_KEY=your_api_key");
            eprintln!("   Or use --mock to use the mock provider");
            return Err(e.into());
        }
    };

    let options = TranslateOptions::new(target)?
        .with_source(source)
        .with_strategy(strategy)
        .with_concurrency(config.concurrency);

    if verbose {
        println!("📝 Input: {}", input);
        println!("🌍 {} → {}", options.source, options.target);
        println!("🔧 Strategy: {} via {}", options.strategy, client.provider_name());
        println!();
    }

    let bytes = std::fs::read(input)?;
    let file_name = Path::new(input)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(input);

    let output = match translate_upload(&client, file_name, None, &bytes, &options).await {
        Ok(output) => output,
        Err(e) => {
            eprintln!("❌ Translation failed: {}", e);
            return Err(e.into());
        }
    };

    let output_path = match matches.get_one::<String>("output") {
        Some(path) => Path::new(path).to_path_buf(),
        None => Path::new(input).with_file_name(&output.file_name),
    };
    std::fs::write(&output_path, &output.bytes)?;

    if verbose {
        println!("📦 Fragments: {}", output.report.fragments);
        if !output.report.fallbacks.is_empty() {
            println!("⚠️  Kept original text for fragments {:?}", output.report.fallbacks);
        }
    }
    println!("{}", output_path.display());

    Ok(())
}
