use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use inkwell_client::{
    api::{AuthToken, CommentId, CommentTarget, NovelId, PostId, User},
    flatten_thread, ApiClient, ClientConfig, CommentBackend, CommentSession, FileTokenStore,
    Outcome, ThreadEntry,
};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "INKWELL_HOST", default_value = "http://127.0.0.1:3000")]
    host: String,

    /// Where the auth token is persisted between invocations
    #[structopt(
        long,
        env = "INKWELL_TOKEN_FILE",
        default_value = ".inkwell-token.json",
        parse(from_os_str)
    )]
    token_file: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
struct TargetOpt {
    /// Comment on a blog post
    #[structopt(long, conflicts_with = "novel", required_unless = "novel")]
    post: Option<i64>,

    /// Comment on a novel
    #[structopt(long)]
    novel: Option<i64>,
}

impl TargetOpt {
    fn target(&self) -> anyhow::Result<CommentTarget> {
        match (self.post, self.novel) {
            (Some(id), None) => Ok(CommentTarget::Post(PostId(id))),
            (None, Some(id)) => Ok(CommentTarget::Novel(NovelId(id))),
            _ => anyhow::bail!("exactly one of --post and --novel must be given"),
        }
    }
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Store the token issued by the auth service
    SetToken { token: String },

    /// Forget the stored token
    Logout,

    Whoami,

    /// Show the admin dashboard
    Stats,

    /// Print a comment thread
    Comments {
        #[structopt(flatten)]
        target: TargetOpt,
    },

    Like {
        #[structopt(flatten)]
        target: TargetOpt,

        comment: i64,
    },

    Delete {
        #[structopt(flatten)]
        target: TargetOpt,

        comment: i64,
    },

    /// Post a new comment, or a reply with --to
    Reply {
        #[structopt(flatten)]
        target: TargetOpt,

        #[structopt(long)]
        to: Option<i64>,

        #[structopt(required = true)]
        content: Vec<String>,
    },
}

async fn viewer(client: &ApiClient) -> anyhow::Result<Option<User>> {
    if client.token()?.is_none() {
        return Ok(None);
    }
    Ok(Some(
        client.whoami().await.context("resolving the logged-in user")?,
    ))
}

async fn open_session(
    client: ApiClient,
    target: &TargetOpt,
) -> anyhow::Result<CommentSession<ApiClient>> {
    let target = target.target()?;
    let viewer = viewer(&client).await?;
    let session = CommentSession::new(client, target, viewer);
    report(&session, session.refresh().await).with_context(|| format!("fetching {target}"))?;
    Ok(session)
}

/// Prints queued notices and turns anything but a completed action into an error
fn report<B: CommentBackend>(session: &CommentSession<B>, outcome: Outcome) -> anyhow::Result<()> {
    for notice in session.take_notices() {
        eprintln!("{}", notice.message);
    }
    match outcome {
        Outcome::Completed => Ok(()),
        Outcome::Skipped => anyhow::bail!("another action on this comment is still in flight"),
        Outcome::Rejected(r) => anyhow::bail!("refused before reaching the server: {r:?}"),
        Outcome::Failed(e) if e.is_auth_failure() => {
            Err(e).context("the server refused the stored token, see `inkwell-ctl set-token`")
        }
        Outcome::Failed(e) => Err(e).context("server request failed"),
    }
}

fn print_thread<B: CommentBackend>(session: &CommentSession<B>) {
    let comments = session.comments();
    if comments.is_empty() {
        println!("no comments on {} yet", session.target());
        return;
    }
    println!("comments on {}", session.target());
    let me = session.viewer().map(|v| v.id);
    for entry in flatten_thread(&comments) {
        let c = entry.comment();
        let liked = match session.is_liked(c.id) {
            true => " (liked)",
            false => "",
        };
        let author = match Some(c.author.id) == me {
            true => format!("{} (you)", c.author),
            false => c.author.to_string(),
        };
        match entry {
            ThreadEntry::Comment(_) => println!(
                "#{} {author} [{} likes{liked}, {} replies] {}\n  {}",
                c.id,
                c.likes,
                c.reply_count(),
                c.created_at.format("%Y-%m-%d %H:%M"),
                c.content,
            ),
            ThreadEntry::Reply(r) => {
                let to = match r.is_nested {
                    true => format!(" to {}", r.parent_user),
                    false => String::new(),
                };
                println!(
                    "    #{} {author}{to} [{} likes{liked}] {}\n      {}",
                    c.id,
                    c.likes,
                    c.created_at.format("%Y-%m-%d %H:%M"),
                    c.content,
                )
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let tokens = Arc::new(FileTokenStore::new(opt.token_file));
    let client = ApiClient::new(ClientConfig::new(opt.host), tokens);

    match opt.cmd {
        Command::SetToken { token } => {
            client
                .set_token(AuthToken(token))
                .context("saving auth token")?;
        }
        Command::Logout => {
            client.clear_token().context("clearing auth token")?;
        }
        Command::Whoami => match viewer(&client).await? {
            Some(user) => println!("{} ({:?}, id {})", user.summary(), user.role, user.id.0),
            None => println!("not logged in"),
        },
        Command::Stats => {
            let stats = client.dashboard().await.context("computing dashboard")?;
            println!(
                "posts:    {} ({} published, {} drafts, {:.1}% published)",
                stats.posts,
                stats.published_posts,
                stats.draft_posts,
                stats.published_pct(),
            );
            println!(
                "novels:   {} ({} ongoing, {} completed, {} on hiatus, {:.1}% completed)",
                stats.novels,
                stats.ongoing_novels,
                stats.completed_novels,
                stats.hiatus_novels,
                stats.completed_pct(),
            );
            println!(
                "chapters: {} ({:.1} per novel)",
                stats.chapters,
                stats.avg_chapters_per_novel(),
            );
        }
        Command::Comments { target } => {
            let session = open_session(client, &target).await?;
            print_thread(&session);
        }
        Command::Like { target, comment } => {
            let session = open_session(client, &target).await?;
            report(&session, session.like(CommentId(comment)).await)
                .with_context(|| format!("liking comment {comment}"))?;
            print_thread(&session);
        }
        Command::Delete { target, comment } => {
            let session = open_session(client, &target).await?;
            report(&session, session.delete(CommentId(comment)).await)
                .with_context(|| format!("deleting comment {comment}"))?;
            print_thread(&session);
        }
        Command::Reply {
            target,
            to,
            content,
        } => {
            let session = open_session(client, &target).await?;
            let content = content.join(" ");
            let outcome = match to {
                Some(parent) => session.submit_reply(CommentId(parent), content).await,
                None => session.submit_comment(content).await,
            };
            report(&session, outcome).context("posting comment")?;
            print_thread(&session);
        }
    }

    Ok(())
}
