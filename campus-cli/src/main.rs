use std::fs;
use std::path::{Path, PathBuf};

use campus_client::{CampusApi, ImageUpload, Post};
use clap::Parser;
use uuid::Uuid;

const TOKEN_FILE: &str = ".campus_token";

#[derive(Parser, Debug)]
struct Cli {
    #[clap(short, long)]
    server: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    Register {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    Login {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    /// Show the authenticated user.
    Me,
    /// List every post, newest first.
    Feed,
    /// List only the authenticated user's posts.
    Profile,
    Show {
        id: Uuid,
    },
    Create {
        #[clap(long)]
        content: Option<String>,
        #[clap(long)]
        image: Option<PathBuf>,
    },
    Update {
        id: Uuid,
        #[clap(long)]
        content: Option<String>,
        #[clap(long)]
        image: Option<PathBuf>,
    },
    Delete {
        id: Uuid,
    },
    /// Like the post, or take the like back if it is already there.
    Like {
        id: Uuid,
    },
    Comment {
        id: Uuid,
        #[clap(long)]
        text: String,
    },
    DeleteComment {
        post_id: Uuid,
        comment_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let endpoint = args.server.as_deref().unwrap_or("http://127.0.0.1:8080");
    let mut api = CampusApi::new(endpoint, load_token())?;

    match args.command {
        Command::Register {
            name,
            email,
            password,
        } => {
            api.register(&name, &email, &password).await?;
            persist_token(&api);
            println!("Registered and logged in as {}", email);
        }
        Command::Login { email, password } => {
            api.login(&email, &password).await?;
            persist_token(&api);
            println!("Logged in as {}", email);
        }
        Command::Me => {
            let me = api.me().await?;
            println!("{} <{}> (id: {})", me.name, me.email, me.id);
        }
        Command::Feed => {
            let posts = api.list_posts().await?;
            println!("Posts ({})", posts.len());
            for post in &posts {
                print_post(post);
            }
        }
        Command::Profile => {
            let me = api.me().await?;
            let posts = api.list_posts().await?;
            let mine: Vec<&Post> = posts.iter().filter(|p| p.user.id == me.id).collect();
            println!("Your posts ({})", mine.len());
            for post in mine {
                print_post(post);
            }
        }
        Command::Show { id } => {
            let post = api.get_post(id).await?;
            print_post(&post);
        }
        Command::Create { content, image } => {
            let image = image.as_deref().map(load_image).transpose()?;
            let post = api.create_post(content.as_deref(), image).await?;
            println!("Post created! ID: {}", post.id);
        }
        Command::Update { id, content, image } => {
            let image = image.as_deref().map(load_image).transpose()?;
            let post = api.update_post(id, content.as_deref(), image).await?;
            print_post(&post);
        }
        Command::Delete { id } => {
            let message = api.delete_post(id).await?;
            println!("{}", message);
        }
        Command::Like { id } => {
            let post = api.toggle_like(id).await?;
            println!("Likes: {}", post.likes.len());
        }
        Command::Comment { id, text } => {
            let post = api.add_comment(id, &text).await?;
            print_post(&post);
        }
        Command::DeleteComment {
            post_id,
            comment_id,
        } => {
            let post = api.delete_comment(post_id, comment_id).await?;
            print_post(&post);
        }
    }

    Ok(())
}

fn print_post(post: &Post) {
    let header = format!(
        "- [{}] {} ({}, {} likes)",
        post.id,
        post.user.name,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.likes.len()
    );
    println!("{}", header);
    if !post.content.is_empty() {
        println!("    {}", post.content);
    }
    if let Some(image) = &post.image {
        println!("    image: {}", image);
    }
    for comment in &post.comments {
        println!("    [{}] {}: {}", comment.id, comment.user.name, comment.text);
    }
}

fn load_image(path: &Path) -> Result<ImageUpload, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let content_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => return Err(format!("{} is not a supported image", path.display()).into()),
    };

    Ok(ImageUpload {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

fn load_token() -> Option<String> {
    fs::read_to_string(TOKEN_FILE)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn persist_token(api: &CampusApi) {
    if let Some(token) = api.token() {
        if let Err(e) = fs::write(TOKEN_FILE, token) {
            eprintln!("warning: could not save token: {}", e);
        }
    }
}
