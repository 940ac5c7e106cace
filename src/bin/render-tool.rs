//! CLI for Render Tool - photorealistic renders from color-mapped exports.

use clap::{Args, Parser, Subcommand};
use render_tool::materials::{CredentialStore, FileStore, KeyValueStore, MaterialRegistry};
use render_tool::server::{self, AppState};
use render_tool::{
    compose, GenerationGateway, GenerationRequest, MaterialRecord, ReplicateProvider, Settings,
    SourceImage,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "render-tool")]
#[command(about = "Turn flat-colored exports into photorealistic renders via Replicate")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an image using the current material mapping
    Generate(GenerateArgs),

    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides RENDER_TOOL_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Inspect or edit the material mapping
    #[command(subcommand)]
    Materials(MaterialsCommand),

    /// Manage the remembered API key
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Args)]
struct GenerateArgs {
    /// Source image (PNG, JPEG, WebP or GIF)
    image: PathBuf,

    /// Style description
    #[arg(short, long, default_value = "")]
    style: String,

    /// API key for this request (falls back to the remembered key)
    #[arg(long)]
    api_key: Option<String>,

    /// Download the result to this path
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Subcommand)]
enum MaterialsCommand {
    /// List all mappings
    List,
    /// Show one mapping
    Show {
        /// Mapping key (e.g. yellow)
        key: String,
    },
    /// Create or replace one mapping
    Set(SetMaterialArgs),
    /// Restore the built-in mappings
    Reset,
    /// Print the instruction that would be sent to the provider
    Prompt {
        /// Style description
        #[arg(short, long, default_value = "")]
        style: String,
    },
}

#[derive(Args)]
struct SetMaterialArgs {
    /// Mapping key (e.g. yellow)
    key: String,

    /// Color as it appears in the source image (e.g. #FFD700)
    #[arg(long)]
    preview_color: String,

    /// Display name
    #[arg(long)]
    name: Option<String>,

    /// Real-world material
    #[arg(long)]
    material: Option<String>,

    /// Finish (matte, satin, polished)
    #[arg(long)]
    finish: Option<String>,

    /// Real-world color code
    #[arg(long)]
    color_code: Option<String>,

    /// Surface pattern
    #[arg(long)]
    pattern: Option<String>,

    /// Component label (oven, sink)
    #[arg(long)]
    component: Option<String>,

    /// Component description
    #[arg(long)]
    description: Option<String>,
}

impl SetMaterialArgs {
    fn into_record(self) -> MaterialRecord {
        MaterialRecord {
            key: self.key,
            display_name: self.name,
            preview_color: self.preview_color,
            material: self.material,
            finish: self.finish,
            color_code: self.color_code,
            pattern: self.pattern,
            component: self.component,
            description: self.description,
            extra: Default::default(),
        }
    }
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Remember an API key for later requests
    Set {
        /// Replicate API token
        token: String,
    },
    /// Forget the remembered API key
    Clear,
    /// Show which credential would be used
    Status,
}

/// Everything a command needs, built once from [`Settings`].
struct Context {
    settings: Settings,
    store: Arc<dyn KeyValueStore>,
}

impl Context {
    fn load() -> anyhow::Result<Self> {
        let settings = Settings::load()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&settings.data_dir)?);
        Ok(Self { settings, store })
    }

    fn registry(&self) -> MaterialRegistry {
        MaterialRegistry::new(self.store.clone())
    }

    fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.store.clone())
    }

    fn provider(&self) -> anyhow::Result<ReplicateProvider> {
        let mut builder = ReplicateProvider::builder();
        if let Some(base) = &self.settings.api_base {
            builder = builder.api_base(base);
        }
        Ok(builder.build()?)
    }

    fn gateway(&self, provider: Arc<ReplicateProvider>) -> GenerationGateway {
        let gateway = GenerationGateway::new(provider)
            .with_operator_credential(self.settings.api_token.clone());
        match self.settings.timeout {
            Some(timeout) => gateway.with_timeout(timeout),
            None => gateway,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load()?;

    match cli.command {
        Commands::Generate(args) => generate(&ctx, args, cli.json).await?,
        Commands::Serve { bind } => serve(&ctx, bind).await?,
        Commands::Materials(cmd) => materials(&ctx, cmd, cli.json)?,
        Commands::Key(cmd) => key(&ctx, cmd, cli.json)?,
    }

    Ok(())
}

async fn generate(ctx: &Context, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let source_image = SourceImage::from_path(&args.image)?;
    let provider = Arc::new(ctx.provider()?);
    let gateway = ctx.gateway(provider.clone());

    let mut request = GenerationRequest::new(&args.style, ctx.registry().load(), source_image);
    request.credential = args.api_key.or_else(|| ctx.credentials().load());

    let url = match gateway.generate(&request).await {
        Ok(url) => url,
        Err(e) if e.is_credential_error() => {
            anyhow::bail!("{e}\nSet one with `render-tool key set <TOKEN>` or REPLICATE_API_TOKEN.");
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.save {
        let data = provider.download(&url).await?;
        std::fs::write(path, &data)?;
    }

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "resultUrl": url,
            "saved": args.save.as_ref().map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Generated render: {url}");
        if let Some(path) = &args.save {
            println!("Saved to: {}", path.display());
        }
    }

    Ok(())
}

async fn serve(ctx: &Context, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let provider = Arc::new(ctx.provider()?);
    let gateway = ctx.gateway(provider);
    if !gateway.has_operator_credential() {
        tracing::warn!("REPLICATE_API_TOKEN not set; clients must send userApiKey");
    }

    let state = AppState::new(Arc::new(ctx.registry()), gateway);
    server::serve(bind.unwrap_or(ctx.settings.bind), state).await?;
    Ok(())
}

fn materials(ctx: &Context, cmd: MaterialsCommand, json_output: bool) -> anyhow::Result<()> {
    let registry = ctx.registry();

    match cmd {
        MaterialsCommand::List => {
            let mapping = registry.load();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&mapping)?);
            } else {
                for (key, record) in mapping.iter() {
                    println!(
                        "{:<12} {:<9} {}",
                        key,
                        record.preview_color,
                        render_tool::prompt::descriptive_label(record)
                    );
                }
            }
        }
        MaterialsCommand::Show { key } => {
            let mapping = registry.load();
            let Some(record) = mapping.get(&key) else {
                anyhow::bail!("no mapping named {key:?}");
            };
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        MaterialsCommand::Set(args) => {
            let key = args.key.clone();
            let mapping = registry.update(&key, args.into_record())?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&mapping)?);
            } else {
                println!("Saved mapping {key:?} ({} total)", mapping.len());
            }
        }
        MaterialsCommand::Reset => {
            registry.reset()?;
            println!("Restored built-in mappings");
        }
        MaterialsCommand::Prompt { style } => {
            println!("{}", compose(&style, &registry.load()));
        }
    }

    Ok(())
}

fn key(ctx: &Context, cmd: KeyCommand, json_output: bool) -> anyhow::Result<()> {
    let credentials = ctx.credentials();

    match cmd {
        KeyCommand::Set { token } => {
            credentials.save(&token)?;
            println!("API key saved");
        }
        KeyCommand::Clear => {
            credentials.clear()?;
            println!("API key cleared");
        }
        KeyCommand::Status => {
            let operator = ctx.settings.api_token.is_some();
            let stored = credentials.load().is_some();
            if json_output {
                let status = serde_json::json!({
                    "operatorKey": operator,
                    "storedKey": stored,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                let source = match (operator, stored) {
                    (true, _) => "REPLICATE_API_TOKEN",
                    (false, true) => "remembered key",
                    (false, false) => "none",
                };
                println!("Credential in use: {source}");
            }
        }
    }

    Ok(())
}
