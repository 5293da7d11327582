use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use docqa_core::{
    CredentialStore, FsDocumentStore, HuggingFaceEndpoint, IncomingArea, InferenceConfig,
    QaCoordinator, QaGateway, ServiceError, ServiceOptions,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Login name
    #[arg(long, env = "DOCQA_USERNAME")]
    username: String,

    /// Login password
    #[arg(long, env = "DOCQA_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory that keeps raw uploads
    #[arg(long, env = "DOCQA_INCOMING_DIR", default_value = "uploaded_docs")]
    incoming_dir: PathBuf,

    /// Directory that keeps extracted text
    #[arg(long, env = "DOCQA_PROCESSED_DIR", default_value = "processed_docs")]
    processed_dir: PathBuf,

    /// Inference API base URL
    #[arg(
        long,
        env = "DOCQA_INFERENCE_URL",
        default_value = docqa_core::inference::DEFAULT_INFERENCE_URL
    )]
    inference_url: String,

    /// Hugging Face API token
    #[arg(long, env = "HUGGINGFACEHUB_API_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Model repository id
    #[arg(long, env = "DOCQA_MODEL", default_value = docqa_core::inference::DEFAULT_MODEL_ID)]
    model: String,

    /// Sampling temperature in [0, 1]
    #[arg(long, env = "DOCQA_TEMPERATURE", default_value_t = docqa_core::inference::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum number of generated tokens
    #[arg(long, env = "DOCQA_MAX_TOKENS", default_value_t = docqa_core::inference::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a document (admin only). Supported: pdf, docx, txt, xlsx, pptx.
    Upload {
        /// File to upload; its file name becomes the document id.
        #[arg(long)]
        file: PathBuf,
    },
    /// Ask a question answered from the stored documents.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// List stored documents.
    List,
    /// Delete a stored document (admin only).
    Delete {
        /// Document id as shown by `list`.
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docqa boot"
    );

    let session = CredentialStore::builtin()
        .login(&cli.username, &cli.password)
        .map_err(|error| anyhow::anyhow!("login failed: {error}"))?;
    info!(user = %session.username, role = ?session.role, "logged in");

    let store = FsDocumentStore::open(&cli.processed_dir)
        .with_context(|| format!("opening {}", cli.processed_dir.display()))?;
    let incoming = IncomingArea::open(&cli.incoming_dir)
        .with_context(|| format!("opening {}", cli.incoming_dir.display()))?;
    let endpoint = HuggingFaceEndpoint::new(&cli.inference_url, cli.hf_token.clone())?;
    let config = InferenceConfig {
        model_id: cli.model.clone(),
        temperature: cli.temperature,
        max_tokens: cli.max_tokens,
    };
    let gateway = QaGateway::new(endpoint, config)?;
    let service = QaCoordinator::new(store, gateway, ServiceOptions::default())
        .with_incoming(incoming);

    match cli.command {
        Command::Upload { file } => {
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", file.display()))?
                .to_string();
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            match service.upload(&session, &file_name, &bytes) {
                Ok(receipt) => println!(
                    "{} uploaded and processed successfully ({} bytes of text, sha256 {})",
                    receipt.id, receipt.extracted_bytes, receipt.checksum
                ),
                Err(error @ ServiceError::UploadTooLarge { .. }) => {
                    warn!(file = %file_name, %error, "upload rejected");
                    anyhow::bail!("upload rejected: {error}");
                }
                Err(error) => anyhow::bail!("{file_name}: {error}"),
            }
        }
        Command::Ask { question } => match service.ask(&session, &question).await {
            Ok(answer) => {
                println!("Answer:");
                println!("{}", answer.text);
                if !answer.context_ids.is_empty() {
                    println!("context: {}", answer.context_ids.join(", "));
                }
            }
            Err(ServiceError::NoDocuments) => println!("No documents available."),
            Err(error) => anyhow::bail!("{error}"),
        },
        Command::List => {
            let ids = service.documents(&session)?;
            if ids.is_empty() {
                println!("No files uploaded.");
            }
            for id in ids {
                println!("{id}");
            }
        }
        Command::Delete { id } => {
            service.delete(&session, &id)?;
            println!("Deleted {id}");
        }
    }

    Ok(())
}
