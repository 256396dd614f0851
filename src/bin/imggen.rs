//! CLI for imggen - AI image generation.

use clap::{Parser, ValueEnum};
use imggen::{dispatch, parse_size, GenerationRequest, ProviderKind, Quality};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imggen")]
#[command(about = "Generate images using AI (OpenAI, Gemini, Stability, Replicate)")]
#[command(version)]
struct Cli {
    /// Image description
    #[arg(short, long)]
    prompt: String,

    /// Output path
    #[arg(short, long, default_value = "./generated_image.png")]
    output: PathBuf,

    /// Image size as WxH
    #[arg(short, long, default_value = "1024x1024")]
    size: String,

    /// Image quality (OpenAI only)
    #[arg(short, long, value_enum, default_value = "standard")]
    quality: QualityArg,

    /// Provider to use
    #[arg(long, value_enum, default_value = "openai")]
    provider: ProviderArg,

    /// Specific model (Gemini shorthand "flash"/"pro" or a literal id;
    /// Replicate "owner/name")
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Gemini,
    Stability,
    Replicate,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Gemini => ProviderKind::Gemini,
            ProviderArg::Stability => ProviderKind::Stability,
            ProviderArg::Replicate => ProviderKind::Replicate,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    Standard,
    Hd,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Standard => Quality::Standard,
            QualityArg::Hd => Quality::Hd,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let provider: ProviderKind = cli.provider.into();

    let (width, height) = parse_size(&cli.size)?;
    let mut request = GenerationRequest::new(&cli.prompt)
        .with_size(width, height)
        .with_quality(cli.quality.into());
    if let Some(model) = cli.model {
        request = request.with_model(model);
    }

    println!("Generating image with {provider}...");

    let image = dispatch(provider, &request).await?;
    let path = image.save(&cli.output)?;

    println!(
        "Image saved to: {} ({} bytes, {})",
        path.display(),
        image.size(),
        image.format.extension()
    );

    Ok(())
}
