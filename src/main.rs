//! `mediaport` CLI - Resolve media URLs and exercise the control port

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mediaport::port::TITLE_CHANGE_EVENT;
use mediaport::remote::element::MediaElement;
use mediaport::{
    channel_pair, clean_title, format_duration, parse_temp_frag, FetchProxy, MediaController,
    MessagePort, PlayerSession, SimulatedPlayer, UrlResolver,
};

#[derive(Parser)]
#[command(name = "mediaport")]
#[command(about = "Remote media control port and canonical media URL tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a URL to its canonical media form
    Resolve {
        /// URL to resolve
        url: String,

        /// Print the result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check whether two URLs refer to the same media
    ///
    /// Exits non-zero when they differ.
    Compare {
        /// First URL
        a: String,
        /// Second URL
        b: String,
    },

    /// Parse a temporal fragment such as "t=90,120" or "t=1:02:03"
    Frag {
        /// Fragment text, with or without a leading '#'
        fragment: String,
    },

    /// Drive a simulated player over an in-process control port
    Demo {
        /// Media URL fed to the demo player
        #[arg(default_value = "https://www.youtube.com/watch?v=aqz-KE-bpKQ&t=42")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { url, json } => {
            cmd_resolve(&url, json)?;
        }
        Commands::Compare { a, b } => {
            cmd_compare(&a, &b)?;
        }
        Commands::Frag { fragment } => {
            cmd_frag(&fragment);
        }
        Commands::Demo { url } => {
            cmd_demo(&url).await?;
        }
    }

    Ok(())
}

fn cmd_resolve(input: &str, json: bool) -> Result<()> {
    let resolver = UrlResolver::new();
    let media = resolver.resolve_str(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media)?);
        return Ok(());
    }

    println!("🎯 Host:     {}", media.host().display_name());
    println!("🧹 Cleaned:  {}", media.cleaned());
    println!("🌐 Source:   {}", media.source());
    match media.temp_frag() {
        Some(frag) => println!("⏱️  Fragment: {}", frag.to_hash_value()),
        None => println!("⏱️  Fragment: none"),
    }
    println!("🔗 Link:     {}", media.to_link());
    println!("🆔 Identity: {}", media.identity());

    Ok(())
}

fn cmd_compare(a: &str, b: &str) -> Result<()> {
    let resolver = UrlResolver::new();
    let left = resolver.resolve_str(a)?;
    let right = resolver.resolve_str(b)?;

    if left == right {
        println!("✅ Same media");
        println!("   {}", left.identity());
        Ok(())
    } else {
        println!("❌ Different media");
        println!("   a: {}", left.identity());
        println!("   b: {}", right.identity());
        std::process::exit(1);
    }
}

fn cmd_frag(input: &str) {
    match parse_temp_frag(input) {
        Some(frag) => {
            if let Some(start) = frag.start {
                println!("⏱️  Start: {} ({start}s)", format_duration(start));
            }
            if let Some(end) = frag.end {
                println!("⏹️  End:   {} ({end}s)", format_duration(end));
            }
            println!("🔖 Hash:  #{}", frag.to_hash_value());
        }
        None => {
            println!("❌ No temporal fragment in {input:?}");
            std::process::exit(1);
        }
    }
}

async fn cmd_demo(url: &str) -> Result<()> {
    let resolver = UrlResolver::new();
    let media = resolver.resolve_str(url)?;
    println!("🎬 Media:  {} ({})", media.to_link(), media.host());

    let (near, far) = channel_pair(16);
    let controller = MediaController::new(MessagePort::open(near));
    let player = Arc::new(SimulatedPlayer::video(&media.to_link()).with_sample_subtitles());
    let session = PlayerSession::attach(
        MessagePort::open(far),
        player as Arc<dyn MediaElement>,
        Arc::new(FetchProxy::new()?),
    )
    .await?;

    controller.ready().await?;
    println!("🔌 Port ready, {} verbs bound", session.port().methods().await.len());

    controller.play().await?;
    if let Some(start) = media.temp_frag().and_then(|frag| frag.start) {
        controller.seek(start).await?;
        println!("⏩ Seeked to {}", format_duration(start));
    }
    println!(
        "▶️  Playing, position {}",
        format_duration(controller.current_time().await?)
    );

    let shot = controller.screenshot("image/png", None).await?;
    println!(
        "📸 Screenshot: {} bytes ({}) at {}",
        shot.data.len(),
        shot.mime,
        format_duration(shot.time)
    );

    if let Some(track) = controller.text_track("en").await? {
        println!("💬 Track \"{}\": {} cues", track.id, track.cues.len());
    }

    let mut events = controller.notifications();
    session.notify_title("Big Buck Bunny - YouTube").await?;
    if let Ok(note) = events.recv().await {
        if note.event == TITLE_CHANGE_EVENT {
            if let Some(raw) = note.data.as_ref().and_then(|data| data.as_str()) {
                println!("📰 Title:  {}", clean_title(media.host(), raw));
            }
        }
    }

    session.shutdown().await;
    println!("👋 Session closed");

    Ok(())
}
