use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use podkeep::playlist::PathSubst;
use podkeep::sync::{self, DEFAULT_DOWNLOAD_DELAY};
use podkeep::{
    Config, DownloadOptions, NoopReporter, PlaylistFormat, PlaylistJob, PlaylistOptions,
    ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter, Store, SyncResult,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static NEW: Emoji<'_, '_> = Emoji("✨ ", "[n] ");
static WAIT: Emoji<'_, '_> = Emoji("⏳ ", "[.] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static TAG: Emoji<'_, '_> = Emoji("🏷️  ", "[t] ");
static PLAYLIST: Emoji<'_, '_> = Emoji("📜 ", "[p] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Manage and download podcasts
#[derive(Parser, Debug)]
#[command(name = "podkeep")]
#[command(about = "Manage and download podcasts")]
#[command(version)]
struct Args {
    /// Preference file (defaults to ~/.podcastrc)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a podcast to the database
    Add {
        /// The URL of the podcast feed
        url: String,
    },

    /// Remove a podcast and its episodes from the database
    Delete {
        /// The ID of the podcast (see list)
        id: i64,
    },

    /// List podcasts
    List,

    /// Update with recent episodes
    Refresh {
        /// The ID of a specific podcast to refresh
        #[arg(long)]
        cast: Option<i64>,
    },

    /// Download episodes that are not available locally yet
    Download {
        /// The directory to download to
        directory: PathBuf,

        /// Refresh the podcast first
        #[arg(long)]
        refresh: bool,

        /// Overwrite the audio file tags with feed values
        #[arg(long)]
        metadata: bool,

        /// The ID of a specific podcast to download
        #[arg(long)]
        cast: Option<i64>,

        #[command(flatten)]
        throttle: Throttle,
    },

    /// Update tags of all downloaded episodes from stored metadata
    UpdateMetadata {
        /// The ID of a specific podcast to re-tag
        #[arg(long)]
        cast: Option<i64>,
    },

    /// Generate M3U playlists for downloaded episodes
    GenPlaylist {
        /// The directory to generate playlists in
        directory: PathBuf,

        /// Refresh the podcast first
        #[arg(long)]
        refresh: bool,

        /// Download missing episodes first to the specified directory
        #[arg(long, value_name = "DIR")]
        download: Option<PathBuf>,

        /// Overwrite the audio file tags with feed values
        #[arg(long)]
        metadata: bool,

        /// The ID of a specific podcast
        #[arg(long)]
        cast: Option<i64>,

        /// Apply a pattern substitution to each file path (pattern^replacement)
        #[arg(long, value_name = "PATTERN^REPLACEMENT")]
        path_subst: Option<PathSubst>,

        /// Write one path per line instead of extended M3U
        #[arg(long)]
        plain: bool,

        /// Only list this many of the most recent episodes
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        throttle: Throttle,
    },
}

#[derive(ClapArgs, Debug)]
struct Throttle {
    /// Seconds to wait before each episode download
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_DOWNLOAD_DELAY.as_secs())]
    delay: u64,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn line(&self, message: String) {
        let _ = self.multi.println(message);
    }

    fn start_download_bar(&self, title: &str, length: Option<u64>) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length.unwrap_or(0)));
        bar.set_style(style);
        bar.set_message(truncate_title(title, 40));
        *self.download_bar.lock().unwrap() = Some(bar.clone());
        bar
    }

    fn finish_download_bar(&self) {
        if let Some(bar) = self.download_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RefreshStarting { podcast, .. } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Refreshing {}", podcast.cyan()));
            }

            ProgressEvent::EpisodeInserted { podcast, title } => {
                self.line(format!("  {NEW}Insert {}: {}", podcast.bold(), title));
            }

            ProgressEvent::EpisodeUpdated { .. } => {}

            ProgressEvent::ItemSkipped { podcast, reason } => {
                self.line(format!("  {}: {}", podcast.yellow(), reason.dimmed()));
            }

            ProgressEvent::RefreshCompleted {
                podcast,
                inserted,
                updated,
                skipped,
            } => {
                self.line(format!(
                    "{HEADPHONES}{} • {} new, {} updated, {} skipped",
                    podcast.bold().green(),
                    inserted.to_string().yellow(),
                    updated.to_string().cyan(),
                    skipped.to_string().dimmed()
                ));
            }

            ProgressEvent::RefreshFailed { podcast, error } => {
                self.line(format!("{FAILURE}{} - {}", podcast.red(), error.red()));
            }

            ProgressEvent::DownloadWaiting {
                episode_title,
                delay,
                ..
            } => {
                self.main_bar.set_message(format!(
                    "{WAIT}Downloading in {}s: {}",
                    delay.as_secs(),
                    truncate_title(&episode_title, 50)
                ));
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                content_length,
            } => {
                self.start_download_bar(&episode_title, content_length);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted {
                episode_title,
                path,
                ..
            } => {
                self.finish_download_bar();
                self.line(format!(
                    "{SUCCESS}{} -> {}",
                    truncate_title(&episode_title, 40).green(),
                    path.display().to_string().dimmed()
                ));
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                self.finish_download_bar();
                self.line(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::TagsWritten { path } => {
                self.line(format!("  {TAG}{}", path.display().to_string().dimmed()));
            }

            ProgressEvent::TagsFailed { path, error } => {
                self.line(format!(
                    "{FAILURE}{} - {}",
                    path.display().to_string().red(),
                    error.red()
                ));
            }

            ProgressEvent::PlaylistWritten { path, entries } => {
                self.line(format!(
                    "{PLAYLIST}{} ({} episodes)",
                    path.display().to_string().cyan(),
                    entries
                ));
            }

            ProgressEvent::PlaylistFailed { podcast, error } => {
                self.line(format!("{FAILURE}{} - {}", podcast.red(), error.red()));
            }
        }
    }
}

impl Drop for IndicatifReporter {
    fn drop(&mut self) {
        self.finish_download_bar();
        self.main_bar.finish_and_clear();
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fail early when `--cast` names a podcast that does not exist
fn check_cast(store: &Store, cast: Option<i64>) -> Result<()> {
    if let Some(id) = cast {
        store.get_podcast(id)?;
    }
    Ok(())
}

fn print_summary(result: &SyncResult, quiet: bool) {
    if quiet {
        return;
    }

    println!(
        "\n{PARTY}{} {} refreshed, {} new, {} downloaded, {} tagged, {} playlists, {} failed",
        "Done:".bold().green(),
        result.refreshed.to_string().cyan(),
        result.inserted.to_string().yellow(),
        result.downloaded.to_string().green().bold(),
        result.tagged.to_string().cyan(),
        result.playlists.len().to_string().cyan(),
        if result.failures.is_empty() {
            "0".green()
        } else {
            result.failures.len().to_string().red().bold()
        }
    );

    if !result.failures.is_empty() {
        println!("\n{}", "Failures:".red().bold());
        for (subject, error) in &result.failures {
            println!("  {}{} - {}", CROSS, subject.yellow(), error.dimmed());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load(args.config.as_deref()).context("Failed to load preferences")?;
    let store = config
        .store_location()?
        .open()
        .context("Failed to open podcast database")?;

    let client = ReqwestClient::new();
    let quiet = args.quiet;

    let result = match args.command {
        Command::Add { url } => {
            let id = store.add_podcast(&url).context("Failed to add podcast")?;
            if !quiet {
                println!("{SUCCESS}Added podcast {id}: {}", url.cyan());
            }
            return Ok(());
        }

        Command::Delete { id } => {
            store
                .delete_podcast(id)
                .with_context(|| format!("Failed to delete podcast {id}"))?;
            if !quiet {
                println!("{SUCCESS}Deleted podcast {id}");
            }
            return Ok(());
        }

        Command::List => {
            for podcast in store.list_podcasts(None)? {
                println!("{}", podcast.describe());
            }
            return Ok(());
        }

        command => {
            if !quiet {
                println!(
                    "\n{}{} {}\n",
                    MICROPHONE,
                    "podkeep".bold().magenta(),
                    "- Podcast Manager".dimmed()
                );
            }

            let reporter: SharedProgressReporter = if quiet {
                NoopReporter::shared()
            } else {
                Arc::new(IndicatifReporter::new())
            };

            run_batch(&store, &client, command, &reporter).await?
        }
    };

    print_summary(&result, quiet);

    if !result.failures.is_empty()
        && result.refreshed + result.downloaded + result.tagged + result.playlists.len() == 0
    {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_batch(
    store: &Store,
    client: &ReqwestClient,
    command: Command,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult> {
    let result = match command {
        Command::Refresh { cast } => {
            check_cast(store, cast)?;
            sync::refresh(store, client, cast, reporter).await?
        }

        Command::Download {
            directory,
            refresh,
            metadata,
            cast,
            throttle,
        } => {
            check_cast(store, cast)?;
            let options = DownloadOptions {
                directory,
                delay: Duration::from_secs(throttle.delay),
                update_tags: metadata,
            };
            sync::download(store, client, cast, refresh, &options, reporter).await?
        }

        Command::UpdateMetadata { cast } => {
            check_cast(store, cast)?;
            sync::update_metadata(store, cast, reporter)?
        }

        Command::GenPlaylist {
            directory,
            refresh,
            download,
            metadata,
            cast,
            path_subst,
            plain,
            limit,
            throttle,
        } => {
            check_cast(store, cast)?;
            let job = PlaylistJob {
                directory,
                refresh_first: refresh,
                download: download.map(|dir| DownloadOptions {
                    directory: dir,
                    delay: Duration::from_secs(throttle.delay),
                    update_tags: metadata,
                }),
                update_tags: metadata,
                playlist: PlaylistOptions {
                    format: if plain {
                        PlaylistFormat::Plain
                    } else {
                        PlaylistFormat::Extended
                    },
                    path_subst,
                    limit,
                },
            };
            sync::generate_playlists(store, client, cast, &job, reporter).await?
        }

        Command::Add { .. } | Command::Delete { .. } | Command::List => SyncResult::default(),
    };

    Ok(result)
}
