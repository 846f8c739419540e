//! Command dispatch for the CLI.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use blogline_core::models::{PostQuery, ProfileUpdate, Registration, Upload, User};
use blogline_core::{guard, Access, Config, SessionClient};
use tracing::{info, warn};

use crate::output;

/// Username used by `login` when none is given on the command line
const ENV_USERNAME: &str = "BLOGLINE_USERNAME";
/// Password used by `login` instead of prompting
const ENV_PASSWORD: &str = "BLOGLINE_PASSWORD";

pub async fn run(
    client: &SessionClient,
    config: &mut Config,
    command: &str,
    args: &[String],
) -> Result<()> {
    match command {
        // ===== Account =====
        "login" => login(client, config, args.first().map(String::as_str)).await,
        "logout" => {
            client.logout()?;
            println!("Logged out.");
            Ok(())
        }
        "whoami" => {
            let user = require_user(client)?;
            output::print_user(&user);
            Ok(())
        }
        "register" => register(client).await,
        "profile" => profile(client, args).await,

        // ===== Posts =====
        "posts" => {
            let page = optional_number(args, 0, "page")?.unwrap_or(1);
            output::print_posts(&client.list_posts(&PostQuery::page(page)).await?);
            Ok(())
        }
        "post" => show_post(client, args).await,
        "mine" => {
            require_user(client)?;
            let page = optional_number(args, 0, "page")?;
            output::print_posts(&client.my_posts(page).await?);
            Ok(())
        }
        "feed" => {
            require_user(client)?;
            let page = optional_number(args, 0, "page")?;
            output::print_posts(&client.timeline(page).await?);
            Ok(())
        }
        "search" => {
            let query = args.join(" ");
            if query.trim().is_empty() {
                bail!("Usage: blogline search <query>");
            }
            output::print_posts(&client.search(&query, None).await?);
            Ok(())
        }
        "delete-post" => {
            require_user(client)?;
            let id = required_id(args, 0, "post id")?;
            client.delete_post(id).await?;
            println!("Deleted post {}.", id);
            Ok(())
        }

        // ===== Social =====
        "comment" => {
            require_user(client)?;
            let post = required_id(args, 0, "post id")?;
            let text = required_text(args.get(1..).unwrap_or_default(), "comment text")?;
            let comment = client.create_comment(post, &text, None).await?;
            println!("Comment {} added to post {}.", comment.id, post);
            Ok(())
        }
        "reply" => {
            require_user(client)?;
            let post = required_id(args, 0, "post id")?;
            let parent = required_id(args, 1, "comment id")?;
            let text = required_text(args.get(2..).unwrap_or_default(), "reply text")?;
            let comment = client.create_comment(post, &text, Some(parent)).await?;
            println!("Reply {} added under comment {}.", comment.id, parent);
            Ok(())
        }
        "like" => {
            require_user(client)?;
            let id = required_id(args, 0, "post id")?;
            let toggle = client.toggle_like(id).await?;
            println!("{}", if toggle.liked { "Liked." } else { "Like removed." });
            Ok(())
        }
        "bookmark" => {
            require_user(client)?;
            let id = required_id(args, 0, "post id")?;
            let toggle = client.toggle_bookmark(id).await?;
            println!("{}", if toggle.bookmarked { "Bookmarked." } else { "Bookmark removed." });
            Ok(())
        }
        "bookmarks" => {
            require_user(client)?;
            let page = optional_number(args, 0, "page")?;
            output::print_bookmarks(&client.my_bookmarks(page).await?);
            Ok(())
        }
        "follow" => {
            require_user(client)?;
            let id = required_id(args, 0, "user id")?;
            let toggle = client.toggle_follow(id).await?;
            println!("{}", if toggle.following { "Following." } else { "Unfollowed." });
            Ok(())
        }
        "following" => {
            require_user(client)?;
            output::print_follows(&client.following(None).await?, |f| &f.following);
            Ok(())
        }
        "followers" => {
            require_user(client)?;
            output::print_follows(&client.followers(None).await?, |f| &f.follower);
            Ok(())
        }

        // ===== Taxonomy =====
        "categories" => {
            output::print_categories(&client.categories(None).await?);
            Ok(())
        }
        "tags" => {
            output::print_tags(&client.tags(None).await?);
            Ok(())
        }

        other => Err(anyhow!("Unknown command '{}'. Run `blogline help` for usage.", other)),
    }
}

// ============================================================================
// Account commands
// ============================================================================

async fn login(client: &SessionClient, config: &mut Config, username: Option<&str>) -> Result<()> {
    let username = match username {
        Some(name) => name.to_string(),
        None => match std::env::var(ENV_USERNAME) {
            Ok(name) if !name.trim().is_empty() => name,
            _ => prompt_with_default("Username", config.last_username.as_deref())?,
        },
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let user = client.login(&username, &password).await?;
    info!(username = %user.username, "Logged in");
    println!("Logged in as {}.", user.display_name());

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!("Failed to remember username: {:#}", e);
    }
    Ok(())
}

async fn register(client: &SessionClient) -> Result<()> {
    let username = prompt("Username")?;
    let email = prompt("Email")?;
    let first_name = non_empty(prompt("First name (optional)")?);
    let last_name = non_empty(prompt("Last name (optional)")?);
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let password2 =
        rpassword::prompt_password("Repeat password: ").context("Failed to read password")?;

    client
        .register(&Registration {
            username: username.clone(),
            email,
            password,
            password2,
            first_name,
            last_name,
        })
        .await?;
    println!("Account created. Run `blogline login {}` to sign in.", username);
    Ok(())
}

async fn profile(client: &SessionClient, args: &[String]) -> Result<()> {
    require_user(client)?;
    let update = parse_profile_flags(args)?;
    if update.is_empty() {
        output::print_user(&client.profile().await?);
        return Ok(());
    }
    let profile = client.update_profile(&update).await?;
    println!("Profile updated.");
    output::print_profile(&profile);
    Ok(())
}

fn parse_profile_flags(args: &[String]) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("Missing value for {}", flag))?
            .clone();
        match flag.as_str() {
            "--bio" => update.bio = Some(value),
            "--location" => update.location = Some(value),
            "--website" => update.website = Some(value),
            "--avatar" => update.avatar = Some(Upload::from_path(Path::new(&value))?),
            other => bail!("Unknown profile option '{}'", other),
        }
    }
    Ok(update)
}

// ============================================================================
// Post commands
// ============================================================================

async fn show_post(client: &SessionClient, args: &[String]) -> Result<()> {
    let id = required_id(args, 0, "post id")?;
    let as_json = args.iter().any(|a| a == "--json");

    let (detail, likes) = futures::try_join!(client.get_post(id), client.post_likes(id, None))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        output::print_post(&detail, &likes);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Route guard for commands that need a signed-in user.
fn require_user(client: &SessionClient) -> Result<User> {
    let session = client.session();
    match guard(&session) {
        Access::Granted(user) => Ok(user.clone()),
        Access::Pending => bail!("Session check has not finished"),
        Access::RedirectToLogin => bail!("Not logged in. Run `blogline login` first."),
    }
}

fn required_id(args: &[String], index: usize, what: &str) -> Result<i64> {
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("Missing {}", what))?;
    raw.parse()
        .with_context(|| format!("Invalid {} '{}'", what, raw))
}

fn optional_number(args: &[String], index: usize, what: &str) -> Result<Option<u32>> {
    args.get(index)
        .map(|raw| raw.parse().with_context(|| format!("Invalid {} '{}'", what, raw)))
        .transpose()
}

fn required_text(words: &[String], what: &str) -> Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        bail!("Missing {}", what);
    }
    Ok(text)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn prompt(label: &str) -> Result<String> {
    prompt_with_default(label, None)
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    let mut stdout = io::stdout();
    match default {
        Some(default) => write!(stdout, "{} [{}]: ", label, default)?,
        None => write!(stdout, "{}: ", label)?,
    }
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    let line = line.trim().to_string();

    match (line.is_empty(), default) {
        (true, Some(default)) => Ok(default.to_string()),
        _ => Ok(line),
    }
}
