//! Interactive shell over the client controllers.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use lockerbox_app::{App, ChatController, Completion, NoticeReceiver, Session};
use lockerbox_common::{ChatId, SensitiveString};

/// One line typed at the shell prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Whoami,
    Ls,
    Cd(String),
    Up(usize),
    Rename { name: String, new_name: String },
    Move { name: String, destination: String },
    Remove(String),
    Mkdir(String),
    Put { source: PathBuf, name: Option<String> },
    Get { name: String, dest: Option<PathBuf> },
    Share { name: String, to: String },
    Recipients(String),
    Unshare { name: String, user: Option<String> },
    Chats,
    Open(ChatId),
    Say(String),
    New { to: String, message: String },
    Drop(ChatId),
    Shares,
    Fetch { owner: String, path: String, dest: Option<PathBuf> },
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  login USER               sign in (prompts for the password)
  logout                   sign out
  whoami                   show the signed-in user
  ls                       list the current directory
  cd NAME | cd ..          enter a directory, or go up one level
  up N                     go back to breadcrumb N (0 = Home)
  rename NAME NEW          rename an entry
  mv NAME DEST             move an entry into directory DEST
  rm NAME                  delete an entry
  mkdir NAME               create a directory
  put LOCAL [NAME]         upload a local file
  get NAME [DEST]          download a file
  share NAME USER          share a file with USER
  recipients NAME          list who a file is shared with
  unshare NAME [USER]      stop sharing a file, with USER or everyone
  chats                    list conversations
  open ID                  show a conversation
  say TEXT                 send TEXT to the open conversation
  new USER MESSAGE         start a conversation
  drop ID                  delete a conversation
  shares                   list files shared with you
  fetch USER PATH [DEST]   download a file USER shared with you
  quit                     leave the shell";

fn arg(args: &[&str], index: usize, name: &str) -> Result<String> {
    match args.get(index) {
        Some(value) => Ok((*value).to_string()),
        None => bail!("missing {}", name),
    }
}

fn rest(args: &[&str], from: usize, name: &str) -> Result<String> {
    if args.len() <= from {
        bail!("missing {}", name);
    }
    Ok(args[from..].join(" "))
}

fn chat_id(args: &[&str]) -> Result<ChatId> {
    ChatId::new(arg(args, 0, "conversation id")?).context("Invalid conversation id")
}

impl Command {
    /// Parse a prompt line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = match words.split_first() {
            Some((name, args)) => (*name, args),
            None => return Ok(None),
        };

        let command = match name {
            "login" => Self::Login(arg(args, 0, "username")?),
            "logout" => Self::Logout,
            "whoami" => Self::Whoami,
            "ls" => Self::Ls,
            "cd" => Self::Cd(arg(args, 0, "directory")?),
            "up" => Self::Up(
                arg(args, 0, "breadcrumb index")?
                    .parse()
                    .context("Breadcrumb index must be a number")?,
            ),
            "rename" => Self::Rename {
                name: arg(args, 0, "name")?,
                new_name: arg(args, 1, "new name")?,
            },
            "mv" => Self::Move {
                name: arg(args, 0, "name")?,
                destination: arg(args, 1, "destination")?,
            },
            "rm" => Self::Remove(arg(args, 0, "name")?),
            "mkdir" => Self::Mkdir(arg(args, 0, "name")?),
            "put" => Self::Put {
                source: PathBuf::from(arg(args, 0, "local file")?),
                name: args.get(1).map(|s| s.to_string()),
            },
            "get" => Self::Get {
                name: arg(args, 0, "name")?,
                dest: args.get(1).map(PathBuf::from),
            },
            "share" => Self::Share {
                name: arg(args, 0, "name")?,
                to: arg(args, 1, "user")?,
            },
            "recipients" => Self::Recipients(arg(args, 0, "name")?),
            "unshare" => Self::Unshare {
                name: arg(args, 0, "name")?,
                user: args.get(1).map(|s| s.to_string()),
            },
            "chats" => Self::Chats,
            "open" => Self::Open(chat_id(args)?),
            "say" => Self::Say(rest(args, 0, "message")?),
            "new" => Self::New {
                to: arg(args, 0, "user")?,
                message: rest(args, 1, "message")?,
            },
            "drop" => Self::Drop(chat_id(args)?),
            "shares" => Self::Shares,
            "fetch" => Self::Fetch {
                owner: arg(args, 0, "user")?,
                path: arg(args, 1, "path")?,
                dest: args.get(2).map(PathBuf::from),
            },
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(Some(command))
    }
}

/// Prompt for a password without echoing it.
pub fn prompt_password(prompt: &str) -> Result<SensitiveString> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(SensitiveString::new(password))
}

/// Print what a controller operation did, if the user needs to know.
fn print_completion(completion: &Completion) {
    match completion {
        Completion::Invalid(reason) => eprintln!("{}", reason),
        Completion::Skipped => eprintln!("Nothing to do (are you signed in?)"),
        Completion::Applied | Completion::Discarded | Completion::Failed(_) => {}
    }
}

fn print_notices(notices: &mut NoticeReceiver) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("error: {}", notice);
    }
}

fn format_time(time: DateTime<chrono::Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

async fn prompt(app: &App) -> String {
    let path = app.files().path().await;
    match app.view().username() {
        Some(username) => format!("{}:{}> ", username, path),
        None => "lockerbox> ".to_string(),
    }
}

/// Run the shell until `quit` or end of input.
pub async fn run(app: App, mut notices: NoticeReceiver) -> Result<()> {
    match app.start().await {
        Session::Authenticated(user) => println!("Signed in as {} ({})", user.username, user.name),
        _ => println!("Not signed in. Use 'login USER'."),
    }
    print_notices(&mut notices);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(prompt(&app).await.as_bytes()).await?;
        stdout.flush().await?;

        let line = match lines.next_line().await.context("Failed to read input")? {
            Some(line) => line,
            None => break,
        };

        match Command::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&app, command).await {
                    eprintln!("error: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
        print_notices(&mut notices);
    }

    Ok(())
}

async fn execute(app: &App, command: Command) -> Result<()> {
    let files = app.files();
    let chat = app.chat();

    match command {
        Command::Login(username) => {
            let password = prompt_password("Password: ")?;
            if app.session().login(&username, &password).await.is_applied() {
                println!("Signed in as {}", username);
                app.load().await;
            }
        }
        Command::Logout => {
            if app.session().logout().await.is_applied() {
                println!("Signed out");
            }
        }
        Command::Whoami => match app.session().current() {
            Session::Authenticated(user) => println!("{} ({})", user.username, user.name),
            _ => println!("Not signed in"),
        },
        Command::Ls => {
            print_completion(&files.refresh().await);
            print_listing(app).await;
        }
        Command::Cd(name) => {
            let completion = if name == ".." {
                let depth = files.path().await.depth();
                files.ascend_to_breadcrumb(depth.saturating_sub(1)).await
            } else {
                match files.open(&name).await {
                    Completion::Skipped if app.view().is_authenticated() => {
                        bail!("not a directory: {}", name)
                    }
                    completion => completion,
                }
            };
            print_completion(&completion);
        }
        Command::Up(index) => {
            let crumbs = files.snapshot().await.breadcrumbs();
            if index >= crumbs.len() {
                bail!("no breadcrumb {} (have {})", index, crumbs.join(" > "));
            }
            print_completion(&files.ascend_to_breadcrumb(index).await);
        }
        Command::Rename { name, new_name } => {
            print_completion(&files.rename(&name, &new_name).await)
        }
        Command::Move { name, destination } => {
            print_completion(&files.move_entry(&name, &destination).await)
        }
        Command::Remove(name) => print_completion(&files.remove(&name).await),
        Command::Mkdir(name) => print_completion(&files.create_directory(&name).await),
        Command::Put { source, name } => {
            let name = match name {
                Some(name) => name,
                None => source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .context("Cannot derive a file name from the source path")?,
            };
            let content = tokio::fs::read(&source)
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;
            let size = content.len();
            if files.upload(&name, content).await.is_applied() {
                println!("Uploaded {} ({} bytes)", name, size);
            }
        }
        Command::Get { name, dest } => {
            if let Some(download) = files.download(&name).await {
                let dest = dest.unwrap_or_else(|| PathBuf::from(&download.file_name));
                tokio::fs::write(&dest, &download.content)
                    .await
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
                println!("Saved {} ({} bytes)", dest.display(), download.content.len());
            }
        }
        Command::Share { name, to } => {
            if files.share(&name, &to).await.is_applied() {
                println!("Shared {} with {}", name, to);
            }
        }
        Command::Recipients(name) => {
            if let Some(recipients) = files.share_recipients(&name).await {
                if recipients.is_empty() {
                    println!("{} is not shared with anyone", name);
                }
                for recipient in recipients {
                    println!("  {}", recipient);
                }
            }
        }
        Command::Unshare { name, user } => {
            print_completion(&files.unshare(&name, user.as_deref()).await)
        }
        Command::Chats => {
            print_completion(&chat.load_summaries().await);
            let me = app.view().username().unwrap_or_default();
            let view = chat.snapshot().await;
            if view.summaries.is_empty() {
                println!("No conversations.");
            }
            for summary in &view.summaries {
                println!(
                    "  {}  with {}",
                    summary.id,
                    ChatController::counterpart(summary, &me)
                );
            }
        }
        Command::Open(id) => {
            let completion = match chat.select(id).await {
                Completion::Skipped => chat.refresh_selected().await,
                completion => completion,
            };
            print_completion(&completion);
            print_conversation(app).await;
        }
        Command::Say(text) => {
            chat.set_message(text).await;
            print_completion(&chat.send_message().await);
            print_conversation(app).await;
        }
        Command::New { to, message } => {
            chat.set_recipient(to).await;
            chat.set_initial_message(message).await;
            if chat.create_conversation().await.is_applied() {
                println!("Conversation started");
            }
        }
        Command::Drop(id) => print_completion(&chat.delete_conversation(&id).await),
        Command::Shares => {
            print_completion(&app.shares().refresh().await);
            let groups = app.shares().groups().await;
            if groups.is_empty() {
                println!("Nothing is shared with you.");
            }
            for group in groups.iter() {
                println!("{}:", group.owner);
                for path in &group.paths {
                    println!("  {}", path);
                }
            }
        }
        Command::Fetch { owner, path, dest } => {
            if let Some(download) = app.shares().download(&owner, &path).await {
                let dest = dest.unwrap_or_else(|| PathBuf::from(&download.file_name));
                tokio::fs::write(&dest, &download.content)
                    .await
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
                println!("Saved {} ({} bytes)", dest.display(), download.content.len());
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }

    Ok(())
}

async fn print_listing(app: &App) {
    let view = app.files().snapshot().await;
    println!("{}", view.breadcrumbs().join(" > "));
    if view.is_empty() {
        println!("  (no files)");
    }
    for entry in &view.entries {
        if entry.is_directory {
            println!("  [DIR]  {}/  {}", entry.name, format_time(entry.last_modified));
        } else {
            println!(
                "  [FILE] {} ({} bytes)  {}",
                entry.name,
                entry.size,
                format_time(entry.last_modified)
            );
        }
    }
}

async fn print_conversation(app: &App) {
    let selected = match app.chat().selected().await {
        Some(selected) => selected,
        None => return,
    };
    match selected.messages {
        Some(messages) if messages.is_empty() => println!("  (no messages)"),
        Some(messages) => {
            for message in messages {
                println!("  {}: {}", message.sender, message.text);
            }
        }
        None => println!("  (loading)"),
    }
}
