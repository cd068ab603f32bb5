use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    channel_view::{ChannelView, ViewStatus},
    config::load_settings,
    views::{channel_sidebar, member_list},
    ClientEvent, ClientSettings, FileTokenStore, MessageGroup, Session, SessionError, TokenStore,
};
use shared::{
    domain::{ChannelId, GuildId, MessageId},
    protocol::{CreateChannelRequest, MessageEvent},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured API url.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Connects, prints every guild's sidebar, then follows gateway events.
    Run,
    /// Prints a channel's history and follows new messages.
    Watch {
        #[arg(long)]
        guild: String,
        #[arg(long)]
        channel: String,
    },
    Send {
        #[arg(long)]
        guild: String,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        reply_to: Option<String>,
    },
    Members {
        #[arg(long)]
        guild: String,
        #[arg(long)]
        channel: String,
    },
    CreateChannel {
        #[arg(long)]
        guild: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: Option<String>,
    },
    DeleteChannel {
        #[arg(long)]
        channel: String,
    },
}

fn token_store(settings: &ClientSettings) -> Result<Arc<dyn TokenStore>> {
    let path = settings
        .token_path
        .clone()
        .or_else(FileTokenStore::default_path)
        .context("no config directory for the token file; set APP__TOKEN_PATH")?;
    Ok(Arc::new(FileTokenStore::new(path)))
}

async fn open_session(settings: ClientSettings) -> Result<Arc<Session>> {
    let store = token_store(&settings)?;
    match Session::new(settings, store).await {
        Ok(session) => Ok(session),
        Err(SessionError::MissingCredential) => {
            anyhow::bail!("not logged in; run `desktop login --email ... --password ...` first")
        }
        Err(err) => Err(err.into()),
    }
}

async fn connect(settings: ClientSettings) -> Result<Arc<Session>> {
    let session = open_session(settings).await?;
    session.start();
    session.wait_until_ready().await;
    Ok(session)
}

fn print_groups(groups: &[MessageGroup]) {
    // Groups come newest first; a terminal reads top to bottom.
    for group in groups.iter().rev() {
        match &group.replying_to {
            Some(reply) => println!("{} (reply to {reply}):", group.created_by),
            None => println!("{}:", group.created_by),
        }
        for content in &group.content {
            let at = chrono::DateTime::from_timestamp(content.created_at, 0)
                .map(|at| at.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string());
            let marker = if content.pending { " (sending)" } else { "" };
            println!("  [{at}] {}{marker}", content.content);
        }
    }
}

async fn print_sidebars(session: &Session) {
    let cache = session.cache();
    let cache = cache.read().await;
    for guild in cache.guilds() {
        println!("# {} ({})", guild.name, guild.id);
        let Some(member) = cache.current_member(&guild.id) else {
            continue;
        };
        let sidebar = channel_sidebar(guild, member);
        for category in &sidebar.categories {
            println!("  {}", category.name);
            for channel in &category.channels {
                println!("    #{} ({})", channel.name, channel.id);
            }
        }
        if sidebar.can_manage {
            println!("  (you can manage channels)");
        }
    }
}

async fn watch(session: Arc<Session>, guild: GuildId, channel: ChannelId) -> Result<()> {
    let mut view = ChannelView::open(session, guild, channel).await;
    match view.status() {
        ViewStatus::AccessDenied => anyhow::bail!("you do not have access to this channel"),
        ViewStatus::Failed(message) => anyhow::bail!("failed to load messages: {message}"),
        ViewStatus::Loading | ViewStatus::Loaded => {}
    }
    print_groups(&view.groups());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = view.next_event() => {
                let Some(event) = event else {
                    return Ok(());
                };
                match event {
                    MessageEvent::Created(message) => {
                        println!("{}: {}", message.created_by, message.content);
                    }
                    MessageEvent::Updated(update) => println!("(message {} edited)", update.id),
                    MessageEvent::Deleted(delete) => println!("(message {} deleted)", delete.id),
                    MessageEvent::Other { kind, .. } => tracing::debug!(kind = %kind, "unhandled message event"),
                }
            }
        }
    }
}

async fn follow_events(session: Arc<Session>) -> Result<()> {
    let mut events = session.subscribe_events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => match event {
                Ok(ClientEvent::ChannelCreated(channel)) => {
                    println!("channel #{} created in {}", channel.name, channel.guild_id);
                }
                Ok(ClientEvent::ChannelDeleted(channel)) => {
                    println!("channel #{} deleted in {}", channel.name, channel.guild_id);
                }
                Ok(ClientEvent::PresenceChanged(user_id, status)) => println!("{user_id} is {status}"),
                Ok(ClientEvent::Ready) => print_sidebars(&session).await,
                Ok(ClientEvent::Error(message)) => eprintln!("error: {message}"),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.gateway_url = client_core::config::gateway_url_from_api(&api_url)?;
        settings.api_url = api_url;
    }

    match cli.command {
        Command::Login { email, password } => {
            let store = token_store(&settings)?;
            Session::login(settings, store, &email, &password).await?;
            println!("logged in as {email}");
        }
        Command::Logout => {
            let store = token_store(&settings)?;
            match Session::new(settings, store).await {
                Ok(session) => {
                    session.logout().await?;
                    println!("logged out");
                }
                Err(SessionError::MissingCredential) => println!("not logged in"),
                Err(err) => return Err(err.into()),
            }
        }
        Command::Run => {
            let session = connect(settings).await?;
            print_sidebars(&session).await;
            follow_events(session).await?;
        }
        Command::Watch { guild, channel } => {
            let session = connect(settings).await?;
            watch(session, GuildId::from(guild), ChannelId::from(channel)).await?;
        }
        Command::Send {
            guild,
            channel,
            content,
            reply_to,
        } => {
            let session = open_session(settings).await?;
            let mut view =
                ChannelView::open(session, GuildId::from(guild), ChannelId::from(channel)).await;
            match view
                .send_message(&content, reply_to.map(MessageId::from))
                .await?
            {
                Some(message) => println!("sent message {}", message.id),
                None => println!("nothing to send"),
            }
        }
        Command::Members { guild, channel } => {
            let session = connect(settings).await?;
            let cache = session.cache();
            let cache = cache.read().await;
            let guild = cache
                .guild(&GuildId::from(guild))
                .context("unknown guild")?;
            let channel = guild
                .channel(&ChannelId::from(channel))
                .context("unknown channel")?;
            for section in member_list(guild, channel, cache.presences()) {
                println!("{} ({})", section.label, section.members.len());
                for entry in section.members {
                    println!("  {} #{} [{}]", entry.user.display_name, entry.color, entry.status);
                }
            }
        }
        Command::CreateChannel {
            guild,
            name,
            category,
        } => {
            let session = open_session(settings).await?;
            let created = session
                .http()
                .create_channel(&GuildId::from(guild), &CreateChannelRequest { name, category })
                .await?;
            println!("created channel #{} ({})", created.name, created.id);
        }
        Command::DeleteChannel { channel } => {
            let session = open_session(settings).await?;
            session
                .http()
                .delete_channel(&ChannelId::from(channel))
                .await?;
            println!("deleted channel");
        }
    }

    Ok(())
}
