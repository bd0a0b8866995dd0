use anyhow::Result;
use care_flow::{Summarizer, UploadedFile};
use healthease_service::{
    ServiceConfig, llm::ChatCompletionClient, ocr::build_extractor,
    summarize::ChatCompletionSummarizer,
};
use std::env;

const PREVIEW_CHARS: usize = 500;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("HealthEase report -> OCR -> Summary + Hindi translation");
    println!("=========================================================");

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: ocr_probe <report.png|report.jpg|report.pdf>");
        std::process::exit(1);
    };

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            eprintln!("Example: export OPENAI_API_KEY='your_key_here'");
            std::process::exit(1);
        }
    };

    let bytes = tokio::fs::read(&path).await?;
    let file = match UploadedFile::new(path.as_str(), bytes) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let client = ChatCompletionClient::new(&config.llm)?;
    let extractor = build_extractor(&config, &client);

    println!("Step 1: OCR with {} ({})", extractor.name(), path);
    let extracted_text = match extractor.extract_text(&file).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("OCR failed ({}): {}", e.kind(), e);
            eprintln!();
            eprintln!("Troubleshooting:");
            eprintln!("   - Check the file is a readable png/jpg/jpeg/pdf");
            eprintln!("   - Check tesseract is installed (or set OCR_BACKEND=llm-vision)");
            eprintln!("   - PDF input needs poppler's pdftoppm on PATH");
            std::process::exit(1);
        }
    };

    println!("Extracted {} characters", extracted_text.chars().count());
    println!("────────────────────────────────────");
    if extracted_text.chars().count() > PREVIEW_CHARS {
        let truncated: String = extracted_text.chars().take(PREVIEW_CHARS).collect();
        println!("{}...", truncated);
    } else {
        println!("{}", extracted_text);
    }
    println!();

    println!("Step 2: Summarize & translate with {}", config.llm.summary_model);
    let summarizer = ChatCompletionSummarizer::new(
        client,
        config.llm.summary_model.clone(),
        config.llm.temperature,
    );
    match summarizer.summarize_and_translate(&extracted_text).await {
        Ok(summary) => {
            println!("────────────────────────────────────");
            println!("{}", summary);
        }
        Err(e) => {
            eprintln!("Summarization failed ({}): {}", e.kind(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
