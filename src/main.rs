//! CLI entry point for blog-front

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blog-front")]
#[command(version)]
#[command(about = "A server-rendered blog front end for a headless CMS", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post in the content directory
    New {
        /// Title of the new post
        title: String,

        /// Slug for the new post (derived from the title by default)
        #[arg(short, long)]
        slug: Option<String>,

        /// Create the post as a draft
        #[arg(long)]
        draft: bool,
    },

    /// Pre-render the site into the public folder
    #[command(alias = "g")]
    Generate {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Start the server
    #[command(aliases = ["s", "serve"])]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Disable file watching and live reload
        #[arg(long)]
        r#static: bool,
    },

    /// Post a comment to a running server
    Comment {
        /// Slug of the post
        slug: String,

        /// Commenter name
        #[arg(long)]
        name: String,

        /// Comment text
        #[arg(long)]
        comment: String,

        /// Server address
        #[arg(long, default_value = "http://localhost:4000")]
        url: String,
    },

    /// Clean the public folder
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, route)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "blog_front=debug,info"
    } else {
        "blog_front=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            blog_front::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::New { title, slug, draft } => {
            let blog = blog_front::Blog::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            blog_front::commands::new::create_post(&blog, &title, draft, slug.as_deref())?;
        }

        Commands::Generate { watch } => {
            let blog = blog_front::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");

            blog.generate().await?;
            println!("Generated successfully!");

            if watch {
                tracing::info!("Watching for file changes...");
                blog_front::commands::generate::watch(&blog).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let blog = blog_front::Blog::new(&base_dir)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            blog_front::server::start(&blog, &ip, port, !r#static, open).await?;
        }

        Commands::Comment {
            slug,
            name,
            comment,
            url,
        } => {
            let blog = blog_front::Blog::new(&base_dir)?;
            blog_front::commands::comment::run(
                &url,
                &slug,
                &name,
                &comment,
                blog.config.store.timeout(),
            )
            .await?;
        }

        Commands::Clean => {
            let blog = blog_front::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let blog = blog_front::Blog::new(&base_dir)?;
            blog_front::commands::list::run(&blog, &r#type).await?;
        }

        Commands::Version => {
            println!("blog-front version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
